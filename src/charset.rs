//! Character encoding detection and transcoding
//!
//! Raw page bytes handed over by a fetcher are decoded to UTF-8 before they
//! reach the HTML parser. The encoding is picked by a three-level cascade:
//!
//! 1. `charset` parameter of the Content-Type header
//! 2. `<meta charset>` or `<meta http-equiv="Content-Type">` in the first
//!    kilobyte of the document
//! 3. UTF-8
//!
//! ```rust
//! use web_markdown_extractor::charset::detect_charset;
//!
//! assert_eq!(detect_charset(Some("text/html; charset=ISO-8859-1"), b""), "ISO-8859-1");
//! assert_eq!(detect_charset(None, b"<meta charset=\"utf-8\">"), "UTF-8");
//! assert_eq!(detect_charset(None, b"<p>plain</p>"), "UTF-8");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::{ExtractError, Result};

const DEFAULT_CHARSET: &str = "UTF-8";

/// Number of leading bytes scanned for meta charset declarations
const META_SCAN_LIMIT: usize = 1024;

/// Detect the charset of an HTML payload
pub fn detect_charset(content_type: Option<&str>, html: &[u8]) -> String {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(html))
        .map(|charset| charset.to_uppercase())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Extract the `charset` parameter from a Content-Type header value
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = CHARSET_PARAM
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok())
        .as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a charset declared by a `<meta>` tag near the start of the document
pub fn charset_from_meta(html: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&html[..html.len().min(META_SCAN_LIMIT)]);

    static META_CHARSET: OnceLock<Option<Regex>> = OnceLock::new();
    let html5 = META_CHARSET
        .get_or_init(|| Regex::new(r#"(?i)<meta\s+charset\s*=\s*["']?([^"';>\s/]+)"#).ok())
        .as_ref()?;
    if let Some(m) = html5.captures(&prefix).and_then(|caps| caps.get(1)) {
        return Some(m.as_str().to_string());
    }

    static META_HTTP_EQUIV: OnceLock<Option<Regex>> = OnceLock::new();
    let html4 = META_HTTP_EQUIV
        .get_or_init(|| {
            Regex::new(
                r#"(?i)<meta\s+http-equiv\s*=\s*["']?content-type["']?\s+content\s*=\s*["']?[^"'>]*charset\s*=\s*([^"';>\s]+)"#,
            )
            .ok()
        })
        .as_ref()?;
    html4
        .captures(&prefix)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode HTML bytes to UTF-8 using the detected charset
///
/// Fails with [`ExtractError::MalformedInput`] when the bytes are invalid for
/// the detected charset or the charset label is unknown.
pub fn decode_html<'a>(html: &'a [u8], content_type: Option<&str>) -> Result<Cow<'a, str>> {
    let charset = detect_charset(content_type, html);

    if charset == DEFAULT_CHARSET || charset == "UTF8" {
        let html = html.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(html);
        return std::str::from_utf8(html).map(Cow::Borrowed).map_err(|e| {
            ExtractError::MalformedInput(format!(
                "invalid UTF-8 at byte {}: {}",
                e.valid_up_to(),
                e
            ))
        });
    }

    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes()).ok_or_else(|| {
        ExtractError::MalformedInput(format!("unsupported charset '{}'", charset))
    })?;

    encoding
        .decode_without_bom_handling_and_without_replacement(html)
        .ok_or_else(|| {
            ExtractError::MalformedInput(format!("invalid byte sequence for charset '{}'", charset))
        })
}
