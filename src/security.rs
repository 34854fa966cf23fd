//! Element and URL sanitization rules for the Markdown output
//!
//! Untrusted page markup never reaches the Markdown as executable content:
//!
//! - Script-like and embedded-content elements are dropped with their subtree.
//! - Links with script schemes are rendered as plain text.
//! - Images with script or inline-data sources are skipped.
//! - Element nesting is bounded; deeper trees send the conversion to the
//!   iterative fallback engine instead of recursing further.

/// Elements whose subtree never contributes to the Markdown
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "applet", "canvas",
    "button", "select", "textarea", "input", "link", "meta", "base", "head", "title",
];

/// URL schemes that execute code or embed content
const SCRIPT_URL_SCHEMES: &[&str] = &["javascript:", "vbscript:", "livescript:"];

const UNSAFE_URL_SCHEMES: &[&str] = &["data:", "file:", "about:", "blob:"];

/// Classification of an `href`/`src` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// A navigable URL, absolute or relative
    Navigable,
    /// In-page fragment such as `#section`
    Anchor,
    /// `javascript:` and friends
    Script,
    /// Inline data or local resources
    Unsafe,
    /// Empty or whitespace
    Empty,
}

#[derive(Debug, Clone)]
pub struct SecurityValidator {
    max_depth: usize,
}

impl SecurityValidator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// True when the element and its children are left out of the output
    pub fn is_skipped_element(&self, tag_name: &str) -> bool {
        SKIPPED_ELEMENTS.contains(&tag_name)
    }

    pub fn classify_url(&self, url: &str) -> UrlKind {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return UrlKind::Empty;
        }
        if trimmed.starts_with('#') {
            return UrlKind::Anchor;
        }
        // Browsers ignore embedded whitespace and control characters in schemes
        let scheme: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .take(16)
            .collect::<String>()
            .to_ascii_lowercase();
        if SCRIPT_URL_SCHEMES.iter().any(|s| scheme.starts_with(s)) {
            UrlKind::Script
        } else if UNSAFE_URL_SCHEMES.iter().any(|s| scheme.starts_with(s)) {
            UrlKind::Unsafe
        } else {
            UrlKind::Navigable
        }
    }

    pub fn validate_depth(&self, depth: usize) -> Result<(), String> {
        if depth > self.max_depth {
            Err(format!(
                "nesting depth {} exceeds maximum allowed depth {}",
                depth, self.max_depth
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new(crate::options::DEFAULT_MAX_DEPTH)
    }
}
