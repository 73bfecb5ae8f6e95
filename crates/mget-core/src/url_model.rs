//! Output filename derivation.
//!
//! The name comes from the URL path's last segment, overridden by a
//! `Content-Disposition` `filename=` value when the server sends one. Header
//! parsing is a plain parameter scan, not full MIME parsing. The result is
//! sanitized for Linux filesystems; if no usable name remains the download
//! cannot proceed and the caller fails the job.

/// Derive the local filename for a download, or `None` if neither the URL
/// path nor the header yields a usable name.
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> Option<String> {
    let candidate = content_disposition
        .and_then(content_disposition_filename)
        .or_else(|| filename_from_url_path(url))?;

    let sanitized = sanitize_filename(&candidate);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        None
    } else {
        Some(sanitized)
    }
}

/// Extract the `filename=` value from a raw `Content-Disposition` header.
/// Accepts both `filename="quoted name"` and bare `filename=token` forms.
pub fn content_disposition_filename(header_value: &str) -> Option<String> {
    for param in header_value.split(';') {
        let param = param.trim();
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("filename") {
            continue;
        }
        let value = value.trim();
        let unquoted = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            &value[1..value.len() - 1]
        } else {
            value
        };
        if !unquoted.is_empty() {
            return Some(unquoted.to_string());
        }
    }
    None
}

/// Last path segment of the URL, ignoring query and fragment.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Replace path separators and control characters, trim leading/trailing
/// dots and whitespace, and cap at 255 bytes (NAME_MAX).
fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_path() {
        assert_eq!(
            derive_filename("https://example.com/pool/main/tool_1.2.deb", None).as_deref(),
            Some("tool_1.2.deb")
        );
        assert_eq!(
            derive_filename("https://example.com/file.zip?token=abc", None).as_deref(),
            Some("file.zip")
        );
    }

    #[test]
    fn header_overrides_url_path() {
        assert_eq!(
            derive_filename(
                "https://example.com/archive.zip",
                Some("attachment; filename=\"real-name.tar.gz\"")
            )
            .as_deref(),
            Some("real-name.tar.gz")
        );
    }

    #[test]
    fn header_bare_token() {
        assert_eq!(
            content_disposition_filename("attachment; filename=simple.bin").as_deref(),
            Some("simple.bin")
        );
    }

    #[test]
    fn header_without_filename_param() {
        assert_eq!(content_disposition_filename("inline"), None);
        assert_eq!(content_disposition_filename("attachment; size=3"), None);
    }

    #[test]
    fn no_usable_name() {
        assert_eq!(derive_filename("https://example.com/", None), None);
        assert_eq!(derive_filename("https://example.com", None), None);
        assert_eq!(derive_filename("https://example.com/..", None), None);
        assert_eq!(derive_filename("not a url", None), None);
    }

    #[test]
    fn sanitizes_separators_and_controls() {
        assert_eq!(
            derive_filename(
                "https://example.com/x",
                Some("attachment; filename=\"a/b\\c\x07.txt\"")
            )
            .as_deref(),
            Some("a_b_c_.txt")
        );
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(
            derive_filename("https://example.com/x", Some("attachment; filename=\" ..f.txt. \""))
                .as_deref(),
            Some("f.txt")
        );
    }
}
