//! Constructed-document backend
//!
//! The document is parsed from a raw string with html5ever (through
//! `scraper`), which implements the WHATWG HTML5 parsing algorithm, so
//! malformed markup (unclosed tags, misnested inline elements, stray text) is
//! repaired the same way a browser would repair it. No script is ever
//! evaluated.
//!
//! The tree belongs to [`HtmlDocument`] alone and is released when the adapter
//! is dropped; nothing of it is handed back to the caller. Queries use the
//! same `scraper::Selector` engine as [`LiveDocument`], so a selector matches
//! the same nodes whichever backend runs it.
//!
//! ```rust
//! use web_markdown_extractor::dom::{DomAdapter, HtmlDocument};
//!
//! let dom = HtmlDocument::parse("<h1>Hello<p>unclosed").expect("parsed");
//! let heading = dom.query(&dom.document(), "h1").expect("heading");
//! assert_eq!(dom.text_of(&heading), "Hello");
//! ```

use ego_tree::NodeId;
use scraper::Html;

use crate::charset::decode_html;
use crate::dom::{DomAdapter, LiveDocument, NodeKind};
use crate::error::Result;

/// Disposable document parsed from a raw HTML string
pub struct HtmlDocument {
    tree: LiveDocument,
}

impl HtmlDocument {
    /// Parse raw bytes, detecting the charset from the Content-Type header,
    /// `<meta>` declarations, or defaulting to UTF-8
    ///
    /// # Errors
    ///
    /// [`crate::ExtractError::MalformedInput`] when the bytes cannot be decoded
    /// in the detected charset.
    pub fn parse_bytes(html: &[u8], content_type: Option<&str>) -> Result<Self> {
        let decoded = decode_html(html, content_type)?;
        Self::parse(&decoded)
    }
}

impl DomAdapter for HtmlDocument {
    type Node = NodeId;

    fn parse(html: &str) -> Result<Self> {
        // html5ever accepts any string; recoverable parse errors are collected
        // on the tree rather than surfaced.
        Ok(Self {
            tree: LiveDocument::new(Html::parse_document(html)),
        })
    }

    fn document(&self) -> NodeId {
        self.tree.document()
    }

    fn query_all(&self, root: &NodeId, selector: &str) -> Vec<NodeId> {
        self.tree.query_all(root, selector)
    }

    fn remove_node(&self, node: &NodeId) {
        self.tree.remove_node(node);
    }

    fn text_of(&self, node: &NodeId) -> String {
        self.tree.text_of(node)
    }

    fn inner_html_of(&self, node: &NodeId) -> String {
        self.tree.inner_html_of(node)
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        self.tree.kind(node)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.tree.children(node)
    }

    fn attr(&self, node: &NodeId, name: &str) -> Option<String> {
        self.tree.attr(node, name)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }
}
