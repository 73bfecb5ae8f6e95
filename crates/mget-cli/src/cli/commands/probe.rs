//! `mget probe` – fetch and print remote metadata without downloading.

use anyhow::{Context, Result};
use mget_core::transport::{CurlTransport, Transport};
use mget_core::url_model;

pub fn run_probe(url: &str) -> Result<()> {
    let transport = CurlTransport::new();
    let meta = transport
        .probe(url)
        .with_context(|| format!("probe failed for {}", url))?;

    let filename = url_model::derive_filename(url, meta.content_disposition.as_deref());
    tracing::debug!(url, accept_ranges = meta.accept_ranges, "probe complete");

    match meta.content_length {
        Some(len) => println!("size:          {} bytes", len),
        None => println!("size:          unknown"),
    }
    println!("filename:      {}", filename.as_deref().unwrap_or("<none>"));
    println!(
        "range support: {}",
        if meta.accept_ranges { "yes" } else { "no" }
    );
    Ok(())
}
