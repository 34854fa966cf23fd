//! Web Markdown Extractor
//!
//! Turns a web page into clean Markdown with a metadata header. Pages are
//! treated as adversarial input: ads, navigation chrome, paywalls, lazy
//! images, malformed markup and deeply nested trees are all expected.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `dom`: document access over a constructed and a caller-owned backend
//! - `content`: main-content selection and boilerplate removal
//! - `quality`: extraction confidence and paywall detection
//! - `converter`: rule-based HTML to Markdown engine
//! - `language`: code block language resolution
//! - `fallback`: conversion strategy chain and plain-text engine
//! - `metadata`: page metadata and URL resolution
//! - `frontmatter`: YAML front matter generation
//! - `pipeline`: the `Extractor` wiring the stages together
//! - `charset`: character encoding detection and transcoding
//! - `security`: element and URL sanitization rules
//!
//! # Example
//!
//! ```rust
//! use web_markdown_extractor::{ConversionOptions, extract_html};
//!
//! let html = r#"<html><head><title>Demo</title></head><body>
//!     <nav><a href="/">Home</a></nav>
//!     <article><h1>Hello</h1><p>Some <strong>content</strong>.</p></article>
//! </body></html>"#;
//!
//! let extraction = extract_html(html, &ConversionOptions::default()).unwrap();
//! assert_eq!(extraction.conversion.markdown, "# Hello\n\nSome **content**.");
//! assert_eq!(extraction.result.title.as_deref(), Some("Hello"));
//! ```

pub mod charset;
pub mod content;
pub mod converter;
pub mod dom;
pub mod error;
pub mod fallback;
pub mod frontmatter;
pub mod language;
pub mod metadata;
pub mod options;
pub mod pipeline;
pub mod quality;
pub mod reading_time;
pub mod result;
pub mod security;

// Re-export main types for convenience
pub use content::{ContentSelector, SelectionTier, SelectorConfig};
pub use dom::{DomAdapter, HtmlDocument, LiveDocument};
pub use error::{ExtractError, Result};
pub use options::ConversionOptions;
pub use pipeline::{Extractor, extract_bytes, extract_html};
pub use quality::{QualityScorer, ScoringPolicy};
pub use result::{
    ConversionResult, Extraction, ExtractionOutcome, ExtractionResult, ImageAsset, LinkRef,
};
