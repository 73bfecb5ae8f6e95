//! Minimal HTTP/1.1 server with HEAD and Range GET support for integration tests.
//!
//! Serves a single static body. HEAD responses carry Content-Length and
//! (optionally) Accept-Ranges and Content-Disposition; GET with a Range
//! header answers 206 Partial Content with the requested slice.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body,
    /// and `Accept-Ranges: bytes` is never advertised.
    pub support_ranges: bool,
    /// Content-Disposition header value to attach, if any.
    pub content_disposition: Option<&'static str>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            content_disposition: None,
        }
    }
}

/// Starts a server in a background thread serving `body`. Returns the base
/// URL (e.g. `http://127.0.0.1:12345/`). Runs until the process exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;

    let mut extra = String::new();
    if opts.support_ranges {
        extra.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(cd) = opts.content_disposition {
        extra.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }
    extra.push_str("Connection: close\r\n");

    if method.eq_ignore_ascii_case("HEAD") {
        let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}\r\n", total, extra);
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let (status, slice) = match range.filter(|_| opts.support_ranges) {
            Some((start, end_incl)) => {
                let start = start.min(total);
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start > end_incl {
                    ("416 Range Not Satisfiable", &body[0..0])
                } else {
                    let slice = &body[start as usize..(end_incl + 1) as usize];
                    ("206 Partial Content", slice)
                }
            }
            None => ("200 OK", body),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}\r\n",
            status,
            slice.len(),
            extra
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) from `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(spec) = value.strip_prefix("bytes=") {
                    if let Some((start, end)) = spec.split_once('-') {
                        if let (Ok(s), Ok(e)) = (start.parse(), end.parse()) {
                            range = Some((s, e));
                        }
                    }
                }
            }
        }
    }
    (method, range)
}
