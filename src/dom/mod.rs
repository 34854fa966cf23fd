//! Document access layer
//!
//! Every stage of the pipeline reads and edits the document through the
//! [`DomAdapter`] trait, so the same selection, scoring and conversion code
//! runs against either backend:
//!
//! - [`HtmlDocument`]: built from a raw HTML string. The tree is owned by the
//!   adapter and freed when it is dropped, which keeps memory flat when many
//!   documents are processed in a row.
//! - [`LiveDocument`]: wraps a `scraper::Html` the caller already holds. Edits
//!   made by the pipeline (boilerplate removal) stay visible in the document
//!   returned by [`LiveDocument::into_inner`].
//!
//! Both evaluate selectors with `scraper::Selector`. The caller picks the
//! adapter; nothing in the core inspects which one is in use.

pub mod constructed;
pub mod live;

pub use constructed::HtmlDocument;
pub use live::LiveDocument;

use crate::error::Result;

/// What a node is, as far as the pipeline cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element with its lowercase local name
    Element(String),
    /// Text node contents
    Text(String),
    /// Comments, doctypes and processing instructions
    Other,
}

/// Uniform query and mutation contract over a parsed document
pub trait DomAdapter {
    /// Cheap handle to a node of the document
    type Node: Clone;

    /// Parse an HTML string into a fresh document
    fn parse(html: &str) -> Result<Self>
    where
        Self: Sized;

    /// Document root node
    fn document(&self) -> Self::Node;

    /// All descendants of `root` matching `selector`, in document order
    ///
    /// `root` itself is never part of the result. An unparsable selector
    /// matches nothing.
    fn query_all(&self, root: &Self::Node, selector: &str) -> Vec<Self::Node>;

    /// First descendant of `root` matching `selector`
    fn query(&self, root: &Self::Node, selector: &str) -> Option<Self::Node> {
        self.query_all(root, selector).into_iter().next()
    }

    /// Detach a node (and its subtree) from the document
    fn remove_node(&self, node: &Self::Node);

    /// Concatenated text of all descendant text nodes
    fn text_of(&self, node: &Self::Node) -> String;

    /// Serialized HTML of the node's children
    fn inner_html_of(&self, node: &Self::Node) -> String;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Attribute value of an element node
    fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Lowercase tag name when the node is an element
    fn tag_name(&self, node: &Self::Node) -> Option<String> {
        match self.kind(node) {
            NodeKind::Element(name) => Some(name),
            _ => None,
        }
    }

    /// Whitespace-separated class names of an element
    fn classes(&self, node: &Self::Node) -> Vec<String> {
        self.attr(node, "class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// `<body>` element, or the document root when there is none
    fn body(&self) -> Self::Node {
        let document = self.document();
        self.query(&document, "body").unwrap_or(document)
    }
}

/// Elements whose start and end separate the words around them
const WORD_BOUNDARY_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "caption",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Text of `node` with a line break at every block edge
///
/// Unlike [`DomAdapter::text_of`], adjacent blocks never run together:
/// `<li>a</li><li>b</li>` reads as two words, the way the rendered Markdown
/// does.
pub fn block_text<A: DomAdapter>(dom: &A, node: &A::Node) -> String {
    let mut text = String::new();
    // `None` marks the end of a block element
    let mut stack = vec![Some(node.clone())];
    while let Some(entry) = stack.pop() {
        let Some(current) = entry else {
            text.push('\n');
            continue;
        };
        match dom.kind(&current) {
            NodeKind::Text(contents) => text.push_str(&contents),
            NodeKind::Element(tag) => {
                if WORD_BOUNDARY_ELEMENTS.contains(&tag.as_str()) {
                    text.push('\n');
                    stack.push(None);
                }
                stack.extend(dom.children(&current).into_iter().rev().map(Some));
            }
            NodeKind::Document => {
                stack.extend(dom.children(&current).into_iter().rev().map(Some));
            }
            NodeKind::Other => {}
        }
    }
    text
}

/// Words under `node`, counted across block boundaries
pub fn count_words<A: DomAdapter>(dom: &A, node: &A::Node) -> usize {
    word_count(&block_text(dom, node))
}

/// Number of whitespace-separated words in `text`
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count the element nodes under `node`, `node` included when it is an element
///
/// Iterative so deeply nested documents cannot exhaust the stack.
pub fn count_elements<A: DomAdapter>(dom: &A, node: &A::Node) -> usize {
    let mut count = 0;
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        if matches!(dom.kind(&current), NodeKind::Element(_)) {
            count += 1;
        }
        stack.extend(dom.children(&current));
    }
    count
}

/// True when `node` has an ancestor whose tag is in `tags`
pub fn has_ancestor<A: DomAdapter>(dom: &A, node: &A::Node, tags: &[&str]) -> bool {
    let mut current = dom.parent(node);
    while let Some(parent) = current {
        if let Some(tag) = dom.tag_name(&parent)
            && tags.contains(&tag.as_str())
        {
            return true;
        }
        current = dom.parent(&parent);
    }
    false
}

/// True while `node` is still reachable from the document root
pub fn is_attached<A: DomAdapter>(dom: &A, node: &A::Node) -> bool {
    let mut current = node.clone();
    loop {
        if dom.kind(&current) == NodeKind::Document {
            return true;
        }
        match dom.parent(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
