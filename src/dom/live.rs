//! Live-document backend over `scraper::Html`
//!
//! Used when the caller already holds a parsed page (a crawler, a browser
//! bridge) and wants the extraction to run against that very document.
//! Selectors go through `scraper::Selector`, so any CSS the caller passes in
//! `custom_selectors` or `exclude_selectors` is supported. The constructed
//! backend runs on this same adapter over a tree it owns.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};
use std::cell::RefCell;
use tracing::debug;

use crate::dom::{DomAdapter, NodeKind};
use crate::error::{ExtractError, Result};

/// Adapter over a caller-owned `scraper::Html`
pub struct LiveDocument {
    html: RefCell<Html>,
}

impl LiveDocument {
    pub fn new(html: Html) -> Self {
        Self {
            html: RefCell::new(html),
        }
    }

    /// Give the (possibly cleaned) document back to the caller
    pub fn into_inner(self) -> Html {
        self.html.into_inner()
    }
}

impl From<Html> for LiveDocument {
    fn from(html: Html) -> Self {
        Self::new(html)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|err| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: err.to_string(),
    })
}

impl DomAdapter for LiveDocument {
    type Node = NodeId;

    fn parse(html: &str) -> Result<Self> {
        Ok(Self::new(Html::parse_document(html)))
    }

    fn document(&self) -> NodeId {
        self.html.borrow().tree.root().id()
    }

    fn query_all(&self, root: &NodeId, selector: &str) -> Vec<NodeId> {
        let selector = match parse_selector(selector) {
            Ok(selector) => selector,
            Err(err) => {
                debug!(error = %err, "selector ignored");
                return Vec::new();
            }
        };
        let html = self.html.borrow();
        let Some(node) = html.tree.get(*root) else {
            return Vec::new();
        };

        if let Some(element) = ElementRef::wrap(node) {
            return element.select(&selector).map(|found| found.id()).collect();
        }
        if node.id() != html.tree.root().id() {
            return Vec::new();
        }
        // `Html::select` walks every allocated node, detached ones included, so
        // the document case goes through the root element's subtree instead.
        let root_element = html.root_element();
        let mut found = Vec::new();
        if selector.matches(&root_element) {
            found.push(root_element.id());
        }
        found.extend(root_element.select(&selector).map(|found| found.id()));
        found
    }

    fn remove_node(&self, node: &NodeId) {
        let mut html = self.html.borrow_mut();
        if let Some(mut node) = html.tree.get_mut(*node) {
            node.detach();
        }
    }

    fn text_of(&self, node: &NodeId) -> String {
        let html = self.html.borrow();
        let Some(node) = html.tree.get(*node) else {
            return String::new();
        };
        match node.value() {
            Node::Text(text) => text.text.to_string(),
            _ => node
                .descendants()
                .filter_map(|descendant| descendant.value().as_text())
                .map(|text| &*text.text)
                .collect(),
        }
    }

    fn inner_html_of(&self, node: &NodeId) -> String {
        let html = self.html.borrow();
        let Some(node) = html.tree.get(*node) else {
            return String::new();
        };
        match ElementRef::wrap(node) {
            Some(element) => element.inner_html(),
            None if node.id() == html.tree.root().id() => html.root_element().html(),
            None => String::new(),
        }
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        let html = self.html.borrow();
        let Some(node) = html.tree.get(*node) else {
            return NodeKind::Other;
        };
        match node.value() {
            Node::Document | Node::Fragment => NodeKind::Document,
            Node::Element(element) => NodeKind::Element(element.name().to_ascii_lowercase()),
            Node::Text(text) => NodeKind::Text(text.text.to_string()),
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        let html = self.html.borrow();
        html.tree
            .get(*node)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    fn attr(&self, node: &NodeId, name: &str) -> Option<String> {
        let html = self.html.borrow();
        let node = html.tree.get(*node)?;
        node.value()
            .as_element()
            .and_then(|element| element.attr(name))
            .map(str::to_string)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        let html = self.html.borrow();
        html.tree.get(*node)?.parent().map(|parent| parent.id())
    }
}
