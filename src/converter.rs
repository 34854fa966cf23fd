//! Rule-based HTML to Markdown conversion
//!
//! The [`RuleEngine`] walks the cleaned content subtree depth-first in
//! document order and dispatches each element to a handler that appends
//! Markdown to a shared output buffer. Block handlers keep blank-line
//! separation; inline handlers keep the spacing the source text had.
//!
//! # Element Handlers
//!
//! - **Headings (h1-h6)**: ATX headings (`#` to `######`)
//! - **Paragraphs, line breaks, rules**: blank-line separated text, `---`
//! - **Inline marks**: `**`, `*`, `~~`, `~sub~`, `^sup^`, `==mark==` when
//!   formatting is preserved; plain text otherwise
//! - **Links and images**: resolved against the document base URL, with
//!   titles; script-scheme and anchor-only links become plain text
//! - **Code**: inline backticks and fenced blocks tagged with the resolved
//!   language
//! - **Lists**: ordered and unordered, nested by indentation
//! - **Tables**: GFM pipe tables with declared alignment
//! - **Blockquotes, callouts, figures, definition lists**
//!
//! # Failure
//!
//! Nesting deeper than the configured maximum aborts the walk with
//! [`ExtractError::ConversionEngineUnavailable`]; the caller then moves on
//! to the next strategy.
//!
//! # Example
//!
//! ```rust
//! use web_markdown_extractor::converter::{ConversionStrategy, RuleEngine};
//! use web_markdown_extractor::dom::{DomAdapter, HtmlDocument};
//! use web_markdown_extractor::metadata::UrlResolver;
//! use web_markdown_extractor::ConversionOptions;
//!
//! let dom = HtmlDocument::parse("<h1>Title</h1><p>Some <em>text</em>.</p>").unwrap();
//! let engine = RuleEngine::new(&ConversionOptions::default(), UrlResolver::default()).unwrap();
//! let rendered = engine.convert(&dom, &dom.body()).unwrap();
//! assert_eq!(rendered.markdown, "# Title\n\nSome *text*.");
//! ```

use regex::Regex;
use tracing::debug;

use crate::dom::{DomAdapter, NodeKind, normalize_whitespace};
use crate::error::{ExtractError, Result};
use crate::language::resolve_language;
use crate::metadata::UrlResolver;
use crate::options::ConversionOptions;
use crate::result::{ImageAsset, LinkRef};
use crate::security::{SecurityValidator, UrlKind};

/// Markdown produced by a strategy, with the assets it references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub markdown: String,
    /// Images in document order
    pub images: Vec<ImageAsset>,
    /// Links in document order
    pub links: Vec<LinkRef>,
}

/// A way of turning a content subtree into Markdown
pub trait ConversionStrategy {
    /// Short name used in logs and degradation reasons
    fn name(&self) -> &'static str;

    fn convert<A: DomAdapter>(&self, dom: &A, root: &A::Node) -> Result<Rendered>;
}

/// Per-conversion state threaded through the handlers
#[derive(Debug, Default)]
pub struct ConversionContext {
    images: Vec<ImageAsset>,
    links: Vec<LinkRef>,
    node_count: usize,
}

impl ConversionContext {
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

/// GFM table column alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableAlignment {
    Default,
    Left,
    Center,
    Right,
}

impl TableAlignment {
    fn separator(self) -> &'static str {
        match self {
            TableAlignment::Default => "---",
            TableAlignment::Left => ":---",
            TableAlignment::Center => ":---:",
            TableAlignment::Right => "---:",
        }
    }
}

struct TableRow {
    cells: Vec<String>,
    alignments: Vec<TableAlignment>,
    is_header: bool,
}

/// Elements laid out as blocks of their own
const BLOCK_CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "address",
    "details", "summary", "figcaption", "body", "html", "center", "hgroup", "form", "fieldset",
    "caption", "li", "dd", "dt", "picture",
];

/// Class names that mark an admonition and the label they carry
const CALLOUT_TYPES: &[&str] = &[
    "note",
    "warning",
    "tip",
    "info",
    "important",
    "caution",
    "danger",
    "hint",
];

/// Generic admonition containers, labelled by a type class when present
const CALLOUT_CONTAINERS: &[&str] = &["callout", "admonition", "alert"];

/// Child classes holding an explicit admonition title
const CALLOUT_TITLE_CLASSES: &[&str] = &["admonition-title", "callout-title", "alert-heading"];

const ATTRIBUTION_CLASSES: &[&str] = &["attribution", "quote-attribution", "quote-source", "quote-author"];

/// Attributes carrying the real source of lazily loaded images
const LAZY_IMAGE_ATTRIBUTES: &[&str] = &["data-src", "data-lazy-src", "data-original"];

/// Primary conversion strategy: one Markdown rule per element type
pub struct RuleEngine {
    include_images: bool,
    include_links: bool,
    preserve_formatting: bool,
    resolver: UrlResolver,
    security: SecurityValidator,
    strip_patterns: Vec<Regex>,
}

impl RuleEngine {
    /// Build the engine for one extraction
    ///
    /// Fails with [`ExtractError::ConversionEngineUnavailable`] when a strip
    /// pattern does not compile.
    pub fn new(options: &ConversionOptions, resolver: UrlResolver) -> Result<Self> {
        let strip_patterns = options
            .strip_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| {
                    ExtractError::ConversionEngineUnavailable(format!(
                        "invalid strip pattern {pattern:?}: {err}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include_images: options.include_images,
            include_links: options.include_links,
            preserve_formatting: options.preserve_formatting,
            resolver,
            security: SecurityValidator::new(options.max_depth),
            strip_patterns,
        })
    }

    fn traverse<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        self.security
            .validate_depth(depth)
            .map_err(ExtractError::ConversionEngineUnavailable)?;
        ctx.node_count += 1;

        match dom.kind(node) {
            NodeKind::Element(tag) => self.handle_element(dom, node, &tag, output, depth, ctx),
            NodeKind::Text(text) => {
                push_text(output, &text);
                Ok(())
            }
            NodeKind::Document => self.traverse_children(dom, node, output, depth, ctx),
            NodeKind::Other => Ok(()),
        }
    }

    fn traverse_children<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        for child in dom.children(node) {
            self.traverse(dom, &child, output, depth + 1, ctx)?;
        }
        Ok(())
    }

    fn handle_element<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        tag: &str,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        if tag == "input" {
            handle_checkbox(dom, node, output);
            return Ok(());
        }
        if self.security.is_skipped_element(tag) {
            return Ok(());
        }
        if matches!(tag, "div" | "section" | "aside" | "p")
            && let Some(label) = callout_label(&dom.classes(node))
        {
            return self.handle_callout(dom, node, label, output, depth, ctx);
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = (tag.as_bytes()[1] - b'0') as usize;
                self.handle_heading(dom, node, level, output, depth, ctx)
            }
            "p" => self.handle_paragraph(dom, node, output, depth, ctx),
            "br" => {
                trim_trailing_spaces(output);
                output.push('\n');
                Ok(())
            }
            "hr" => {
                ensure_blank_line(output);
                output.push_str("---\n\n");
                Ok(())
            }
            "a" => self.handle_link(dom, node, output, depth, ctx),
            "img" => {
                self.handle_image(dom, node, output, ctx);
                Ok(())
            }
            "figure" => self.handle_figure(dom, node, output, depth, ctx),
            "ul" => self.handle_list(dom, node, false, output, depth, ctx),
            "ol" => self.handle_list(dom, node, true, output, depth, ctx),
            "pre" => {
                self.handle_code_block(dom, node, output);
                Ok(())
            }
            "code" | "kbd" | "samp" | "tt" => {
                handle_inline_code(dom, node, output);
                Ok(())
            }
            "strong" | "b" => self.handle_mark(dom, node, "**", output, depth, ctx),
            "em" | "i" => self.handle_mark(dom, node, "*", output, depth, ctx),
            "del" | "s" | "strike" => self.handle_mark(dom, node, "~~", output, depth, ctx),
            "sub" => self.handle_mark(dom, node, "~", output, depth, ctx),
            "sup" => self.handle_mark(dom, node, "^", output, depth, ctx),
            "mark" => self.handle_mark(dom, node, "==", output, depth, ctx),
            "table" => self.handle_table(dom, node, output, depth, ctx),
            "blockquote" => self.handle_blockquote(dom, node, output, depth, ctx),
            "dl" => self.handle_definition_list(dom, node, output, depth, ctx),
            _ if BLOCK_CONTAINERS.contains(&tag) => self.handle_block(dom, node, output, depth, ctx),
            _ => self.traverse_children(dom, node, output, depth, ctx),
        }
    }

    fn handle_block<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        ensure_blank_line(output);
        let start_len = output.len();
        self.traverse_children(dom, node, output, depth, ctx)?;
        if output.len() > start_len {
            ensure_blank_line(output);
        }
        Ok(())
    }

    /// Headings render their inline content on a single line; empty
    /// headings are dropped.
    fn handle_heading<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        level: usize,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut content = String::new();
        self.traverse_children(dom, node, &mut content, depth, ctx)?;
        let text = normalize_whitespace(&content);
        if text.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        output.push_str(&"#".repeat(level));
        output.push(' ');
        output.push_str(&text);
        output.push_str("\n\n");
        Ok(())
    }

    fn handle_paragraph<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        ensure_blank_line(output);
        let start_len = output.len();
        self.traverse_children(dom, node, output, depth, ctx)?;
        trim_trailing_spaces(output);
        if output.len() > start_len {
            output.push_str("\n\n");
        }
        Ok(())
    }

    /// Wrap inline content in `marker` on both sides
    ///
    /// Whitespace at the edges of the content moves outside the marks so the
    /// emphasis stays valid (`a **b** c`, never `a** b **c`).
    fn handle_mark<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        marker: &str,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        if !self.preserve_formatting {
            return self.traverse_children(dom, node, output, depth, ctx);
        }

        let mut inner = String::new();
        self.traverse_children(dom, node, &mut inner, depth, ctx)?;
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            if !inner.is_empty() {
                push_space(output);
            }
            return Ok(());
        }
        if trimmed.contains("\n\n") {
            // Block content inside an inline mark cannot carry it
            output.push_str(&inner);
            return Ok(());
        }

        if inner.starts_with(char::is_whitespace) {
            push_space(output);
        }
        output.push_str(marker);
        output.push_str(trimmed);
        output.push_str(marker);
        if inner.ends_with(char::is_whitespace) {
            output.push(' ');
        }
        Ok(())
    }

    /// Render `<a>` as `[text](href "title")`
    ///
    /// Every navigable link is recorded in the context, even when links are
    /// rendered as plain text. Script-scheme, anchor-only and missing targets
    /// keep only their text.
    fn handle_link<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut inner = String::new();
        self.traverse_children(dom, node, &mut inner, depth, ctx)?;
        let label = normalize_whitespace(&inner);

        if inner.starts_with(char::is_whitespace) {
            push_space(output);
        }

        let href = dom.attr(node, "href");
        let target = href
            .as_deref()
            .filter(|href| self.security.classify_url(href) == UrlKind::Navigable);
        match target {
            Some(href) => {
                let resolved = self.resolver.resolve(href);
                let title = attr_text(dom, node, "title");
                ctx.links.push(LinkRef {
                    href: resolved.clone(),
                    text: normalize_whitespace(&dom.text_of(node)),
                    title: title.clone(),
                    is_external: self.resolver.is_external(&resolved),
                });

                if self.include_links && !label.is_empty() {
                    output.push('[');
                    output.push_str(&label);
                    output.push_str("](");
                    push_destination(output, &resolved, &title);
                    output.push(')');
                } else {
                    output.push_str(&label);
                }
            }
            None => output.push_str(&label),
        }

        if !label.is_empty() && inner.ends_with(char::is_whitespace) {
            output.push(' ');
        }
        Ok(())
    }

    /// Render `<img>` as `![alt](src "title")` and record the asset
    fn handle_image<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        ctx: &mut ConversionContext,
    ) {
        if !self.include_images {
            return;
        }
        let Some(src) = self.image_source(dom, node) else {
            return;
        };
        let resolved = self.resolver.resolve(&src);
        let alt = attr_text(dom, node, "alt");
        let title = attr_text(dom, node, "title");

        output.push_str("![");
        output.push_str(&escape_brackets(&alt));
        output.push_str("](");
        push_destination(output, &resolved, &title);
        output.push(')');

        ctx.images.push(ImageAsset {
            src: resolved,
            alt,
            title,
            width: parse_dimension(dom.attr(node, "width").as_deref()),
            height: parse_dimension(dom.attr(node, "height").as_deref()),
        });
    }

    /// Lazy-load attributes win over `src`, which often holds a placeholder
    fn image_source<A: DomAdapter>(&self, dom: &A, node: &A::Node) -> Option<String> {
        LAZY_IMAGE_ATTRIBUTES
            .iter()
            .filter_map(|name| dom.attr(node, name))
            .chain(dom.attr(node, "src"))
            .find(|value| self.security.classify_url(value) == UrlKind::Navigable)
            .map(|value| value.trim().to_string())
    }

    fn handle_figure<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut body = String::new();
        let mut caption = String::new();
        for child in dom.children(node) {
            if dom.tag_name(&child).as_deref() == Some("figcaption") {
                self.traverse_children(dom, &child, &mut caption, depth + 1, ctx)?;
            } else {
                self.traverse(dom, &child, &mut body, depth + 1, ctx)?;
            }
        }

        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }
        ensure_blank_line(output);
        output.push_str(body);
        output.push('\n');
        let caption = normalize_whitespace(&caption);
        if !caption.is_empty() {
            output.push('*');
            output.push_str(&caption);
            output.push_str("*\n");
        }
        output.push('\n');
        Ok(())
    }

    fn handle_list<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        ordered: bool,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        ensure_blank_line(output);
        let start_len = output.len();
        let mut number = dom
            .attr(node, "start")
            .and_then(|start| start.trim().parse::<u64>().ok())
            .unwrap_or(1);

        for child in dom.children(node) {
            match dom.tag_name(&child).as_deref() {
                Some("li") => {
                    let marker = if ordered {
                        let marker = format!("{number}.");
                        number += 1;
                        marker
                    } else {
                        "-".to_string()
                    };
                    self.handle_list_item(dom, &child, &marker, output, depth + 1, ctx)?;
                }
                Some(_) => {
                    // Stray lists directly inside a list nest under the previous item
                    let mut nested = String::new();
                    self.traverse(dom, &child, &mut nested, depth + 1, ctx)?;
                    write_indented(output, &normalize_output(&nested), "  ", "  ");
                }
                None => {}
            }
        }

        if output.len() > start_len {
            ensure_blank_line(output);
        }
        Ok(())
    }

    /// Render one item; continuation lines and nested lists are indented to
    /// the item's content column.
    fn handle_list_item<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        marker: &str,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut content = String::new();
        self.traverse_children(dom, node, &mut content, depth, ctx)?;
        let content = normalize_output(&content);
        if content.is_empty() {
            return Ok(());
        }

        let first_prefix = format!("{marker} ");
        let indent = " ".repeat(first_prefix.len());
        write_indented(output, &content, &first_prefix, &indent);
        Ok(())
    }

    fn handle_code_block<A: DomAdapter>(&self, dom: &A, node: &A::Node, output: &mut String) {
        let mut raw = String::new();
        collect_code(dom, node, &mut raw);
        let code = raw.strip_prefix('\n').unwrap_or(&raw);
        let code = code.trim_end_matches(['\n', '\r']);
        if code.trim().is_empty() {
            return;
        }

        let language = resolve_language(dom, node, code).unwrap_or_default();
        let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);

        ensure_blank_line(output);
        output.push_str(&fence);
        output.push_str(&language);
        output.push('\n');
        output.push_str(code);
        output.push('\n');
        output.push_str(&fence);
        output.push_str("\n\n");
    }

    /// Render a GFM pipe table
    ///
    /// The header row comes from `<thead>` or an all-`<th>` row, else the
    /// first row. Every row is padded to the widest row. A `<caption>` becomes
    /// an italic line above the table. Tables that contain other tables are
    /// layout scaffolding and render as plain blocks.
    fn handle_table<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        if dom.query(node, "table").is_some() {
            return self.handle_block(dom, node, output, depth, ctx);
        }

        let mut rows = Vec::new();
        for (tr, in_head) in table_rows(dom, node) {
            let mut cells = Vec::new();
            let mut alignments = Vec::new();
            let mut all_th = true;
            for cell in dom.children(&tr) {
                let tag = dom.tag_name(&cell);
                if !matches!(tag.as_deref(), Some("td" | "th")) {
                    continue;
                }
                all_th &= tag.as_deref() == Some("th");
                let mut content = String::new();
                self.traverse_children(dom, &cell, &mut content, depth + 2, ctx)?;
                cells.push(cell_text(&content));
                alignments.push(cell_alignment(dom, &cell));

                let span = dom
                    .attr(&cell, "colspan")
                    .and_then(|span| span.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, 100);
                for _ in 1..span {
                    cells.push(String::new());
                    alignments.push(TableAlignment::Default);
                }
            }
            if cells.is_empty() {
                continue;
            }
            rows.push(TableRow {
                cells,
                alignments,
                is_header: in_head || all_th,
            });
        }

        let columns = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }
        let header_index = rows.iter().position(|row| row.is_header).unwrap_or(0);
        let header = rows.remove(header_index);

        let mut caption = String::new();
        if let Some(element) = dom
            .children(node)
            .into_iter()
            .find(|child| dom.tag_name(child).as_deref() == Some("caption"))
        {
            self.traverse_children(dom, &element, &mut caption, depth + 1, ctx)?;
        }
        let caption = normalize_whitespace(&caption);

        ensure_blank_line(output);
        if !caption.is_empty() {
            output.push('*');
            output.push_str(&caption);
            output.push_str("*\n\n");
        }
        write_table_row(output, &header.cells, columns);
        output.push('|');
        for column in 0..columns {
            let alignment = header
                .alignments
                .get(column)
                .copied()
                .filter(|alignment| *alignment != TableAlignment::Default)
                .or_else(|| rows.first().and_then(|row| row.alignments.get(column).copied()))
                .unwrap_or(TableAlignment::Default);
            output.push(' ');
            output.push_str(alignment.separator());
            output.push_str(" |");
        }
        output.push('\n');
        for row in &rows {
            write_table_row(output, &row.cells, columns);
        }
        output.push('\n');
        Ok(())
    }

    /// Quote the body; a `<footer>`, `<cite>` or attribution child becomes a
    /// trailing `> — source` line.
    fn handle_blockquote<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut body = String::new();
        let mut attribution = String::new();
        for child in dom.children(node) {
            if is_attribution(dom, &child) {
                self.traverse_children(dom, &child, &mut attribution, depth + 1, ctx)?;
            } else {
                self.traverse(dom, &child, &mut body, depth + 1, ctx)?;
            }
        }

        let body = normalize_output(&body);
        let attribution = normalize_whitespace(&attribution);
        let attribution = attribution.trim_start_matches(['—', '–', '-', '~', ' ']);
        if body.is_empty() && attribution.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        write_quoted(output, &body);
        if !attribution.is_empty() {
            if !body.is_empty() {
                output.push_str(">\n");
            }
            output.push_str("> — ");
            output.push_str(attribution);
            output.push('\n');
        }
        output.push('\n');
        Ok(())
    }

    fn handle_callout<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        label: String,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut label = label;
        let mut body = String::new();
        for child in dom.children(node) {
            let is_title = dom
                .classes(&child)
                .iter()
                .any(|class| CALLOUT_TITLE_CLASSES.contains(&class.as_str()));
            if is_title {
                let title = normalize_whitespace(&dom.text_of(&child));
                if !title.is_empty() {
                    label = title;
                }
            } else {
                self.traverse(dom, &child, &mut body, depth + 1, ctx)?;
            }
        }

        ensure_blank_line(output);
        output.push_str("> **");
        output.push_str(label.trim_end_matches(':'));
        output.push_str("**\n");
        write_quoted(output, &normalize_output(&body));
        output.push('\n');
        Ok(())
    }

    /// `**Term**` lines followed by indented definitions
    fn handle_definition_list<A: DomAdapter>(
        &self,
        dom: &A,
        node: &A::Node,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        ensure_blank_line(output);
        let start_len = output.len();

        let mut entries = Vec::new();
        let mut stack: Vec<A::Node> = dom.children(node).into_iter().rev().collect();
        while let Some(child) = stack.pop() {
            match dom.tag_name(&child).as_deref() {
                Some(tag @ ("dt" | "dd")) => entries.push((tag == "dt", child)),
                // Groups wrapped in <div> are valid HTML
                Some("div") => stack.extend(dom.children(&child).into_iter().rev()),
                _ => {}
            }
        }

        for (is_term, entry) in entries {
            let mut content = String::new();
            self.traverse_children(dom, &entry, &mut content, depth + 1, ctx)?;
            let text = normalize_whitespace(&content);
            if text.is_empty() {
                continue;
            }
            if is_term {
                ensure_blank_line(output);
                output.push_str("**");
                output.push_str(&text);
                output.push_str("**\n");
            } else {
                output.push_str("  ");
                output.push_str(&text);
                output.push('\n');
            }
        }

        if output.len() > start_len {
            ensure_blank_line(output);
        }
        Ok(())
    }
}

impl ConversionStrategy for RuleEngine {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn convert<A: DomAdapter>(&self, dom: &A, root: &A::Node) -> Result<Rendered> {
        let mut ctx = ConversionContext::default();
        let mut output = String::with_capacity(4096);
        self.traverse(dom, root, &mut output, 0, &mut ctx)?;

        let markdown = strip_artifacts(&self.strip_patterns, &normalize_output(&output));
        debug!(
            nodes = ctx.node_count(),
            images = ctx.images.len(),
            links = ctx.links.len(),
            "rule engine converted content"
        );
        Ok(Rendered {
            markdown,
            images: ctx.images,
            links: ctx.links,
        })
    }
}

fn handle_checkbox<A: DomAdapter>(dom: &A, node: &A::Node, output: &mut String) {
    let is_checkbox = dom
        .attr(node, "type")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"));
    if is_checkbox {
        output.push_str(if dom.attr(node, "checked").is_some() {
            "[x] "
        } else {
            "[ ] "
        });
    }
}

fn handle_inline_code<A: DomAdapter>(dom: &A, node: &A::Node, output: &mut String) {
    let code = dom.text_of(node).replace(['\n', '\r'], " ");
    if code.trim().is_empty() {
        return;
    }
    if code.contains('`') {
        let fence = "`".repeat(longest_backtick_run(&code) + 1);
        output.push_str(&fence);
        output.push(' ');
        output.push_str(&code);
        output.push(' ');
        output.push_str(&fence);
    } else {
        output.push('`');
        output.push_str(&code);
        output.push('`');
    }
}

/// Append a text node, collapsing whitespace but keeping word separation
/// with the surrounding inline content
fn push_text(output: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        push_space(output);
        return;
    }
    if text.starts_with(char::is_whitespace) {
        push_space(output);
    }
    output.push_str(&normalized);
    if text.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

/// Single separating space, never at the start of a line
fn push_space(output: &mut String) {
    if !output.is_empty() && !output.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

fn trim_trailing_spaces(output: &mut String) {
    let trimmed = output.trim_end_matches([' ', '\t']).len();
    output.truncate(trimmed);
}

/// Terminate the current block with exactly one blank line
fn ensure_blank_line(output: &mut String) {
    trim_trailing_spaces(output);
    if output.is_empty() || output.ends_with("\n\n") {
        return;
    }
    if output.ends_with('\n') {
        output.push('\n');
    } else {
        output.push_str("\n\n");
    }
}

fn attr_text<A: DomAdapter>(dom: &A, node: &A::Node, name: &str) -> String {
    dom.attr(node, name)
        .map(|value| normalize_whitespace(&value))
        .unwrap_or_default()
}

/// Link or image target, with an optional quoted title
fn push_destination(output: &mut String, url: &str, title: &str) {
    output.push_str(&url.replace(' ', "%20"));
    if !title.is_empty() {
        output.push_str(" \"");
        output.push_str(&title.replace('"', "\\\""));
        output.push('"');
    }
}

fn escape_brackets(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Pixel dimension from an attribute such as `640` or `640px`
fn parse_dimension(value: Option<&str>) -> u32 {
    value
        .map(|value| value.trim().trim_end_matches("px"))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Text of a `<pre>` block with `<br>` as newlines, whitespace untouched
fn collect_code<A: DomAdapter>(dom: &A, node: &A::Node, output: &mut String) {
    let mut stack: Vec<A::Node> = dom.children(node).into_iter().rev().collect();
    while let Some(current) = stack.pop() {
        match dom.kind(&current) {
            NodeKind::Text(text) => output.push_str(&text),
            NodeKind::Element(tag) if tag == "br" => output.push('\n'),
            NodeKind::Element(_) => stack.extend(dom.children(&current).into_iter().rev()),
            _ => {}
        }
    }
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Label of an admonition container, if its classes mark one
///
/// Accepts type classes (`note`, `warning`), generic containers (`callout`,
/// `admonition`, `alert`) and two-part combinations (`alert-warning`,
/// `tip-callout`). Generic containers without a type are labelled "Note".
fn callout_label(classes: &[String]) -> Option<String> {
    let mut is_callout = false;
    let mut kind = None;
    for class in classes {
        let class = class.to_ascii_lowercase();
        let parts: Vec<&str> = class.split(['-', '_']).filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [single] if CALLOUT_TYPES.contains(single) => {
                is_callout = true;
                kind = kind.or_else(|| Some(single.to_string()));
            }
            [single] if CALLOUT_CONTAINERS.contains(single) => is_callout = true,
            [first, second] => {
                let typed = if CALLOUT_CONTAINERS.contains(first) && CALLOUT_TYPES.contains(second)
                {
                    Some(second)
                } else if CALLOUT_TYPES.contains(first) && CALLOUT_CONTAINERS.contains(second) {
                    Some(first)
                } else {
                    None
                };
                if let Some(typed) = typed {
                    is_callout = true;
                    kind = kind.or_else(|| Some(typed.to_string()));
                }
            }
            _ => {}
        }
    }
    if !is_callout {
        return None;
    }
    let kind = kind.unwrap_or_else(|| "note".to_string());
    let mut chars = kind.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
}

fn is_attribution<A: DomAdapter>(dom: &A, node: &A::Node) -> bool {
    matches!(dom.tag_name(node).as_deref(), Some("footer" | "cite"))
        || dom
            .classes(node)
            .iter()
            .any(|class| ATTRIBUTION_CLASSES.contains(&class.as_str()))
}

/// `<tr>` elements of a table with whether they sit in `<thead>`
fn table_rows<A: DomAdapter>(dom: &A, table: &A::Node) -> Vec<(A::Node, bool)> {
    let mut rows = Vec::new();
    for child in dom.children(table) {
        match dom.tag_name(&child).as_deref() {
            Some("tr") => rows.push((child, false)),
            Some(section @ ("thead" | "tbody" | "tfoot")) => {
                let in_head = section == "thead";
                rows.extend(
                    dom.children(&child)
                        .into_iter()
                        .filter(|row| dom.tag_name(row).as_deref() == Some("tr"))
                        .map(|row| (row, in_head)),
                );
            }
            _ => {}
        }
    }
    rows
}

/// Cell content on one line with pipes escaped
fn cell_text(content: &str) -> String {
    normalize_whitespace(content).replace('|', "\\|")
}

fn cell_alignment<A: DomAdapter>(dom: &A, cell: &A::Node) -> TableAlignment {
    let declared = dom.attr(cell, "align").or_else(|| {
        dom.attr(cell, "style").and_then(|style| {
            style.split(';').find_map(|declaration| {
                let (property, value) = declaration.split_once(':')?;
                property
                    .trim()
                    .eq_ignore_ascii_case("text-align")
                    .then(|| value.trim().to_string())
            })
        })
    });
    match declared.map(|value| value.to_ascii_lowercase()).as_deref() {
        Some("left") => TableAlignment::Left,
        Some("center") => TableAlignment::Center,
        Some("right") => TableAlignment::Right,
        _ => TableAlignment::Default,
    }
}

fn write_table_row(output: &mut String, cells: &[String], columns: usize) {
    output.push('|');
    for column in 0..columns {
        output.push(' ');
        output.push_str(cells.get(column).map(String::as_str).unwrap_or(""));
        output.push_str(" |");
    }
    output.push('\n');
}

/// Prefix every line of `body` with `> `
fn write_quoted(output: &mut String, body: &str) {
    for line in body.lines() {
        if line.is_empty() {
            output.push_str(">\n");
        } else {
            output.push_str("> ");
            output.push_str(line);
            output.push('\n');
        }
    }
}

/// Write `content` with `first` before its first line and `rest` before the
/// others; blank lines outside fenced code are dropped to keep lists tight.
fn write_indented(output: &mut String, content: &str, first: &str, rest: &str) {
    let mut fence: Option<usize> = None;
    for (index, line) in content.lines().enumerate() {
        let in_fence = fence.is_some();
        fence = next_fence_state(fence, line);
        if line.trim().is_empty() {
            if in_fence {
                output.push('\n');
            }
            continue;
        }
        output.push_str(if index == 0 { first } else { rest });
        output.push_str(line);
        output.push('\n');
    }
}

/// Length of a backtick fence opening `line`, looking through quote and
/// indentation prefixes; `closes` is true when nothing follows the fence
fn fence_marker(line: &str) -> Option<(usize, bool)> {
    let stripped = line.trim_start_matches([' ', '>']);
    let run = stripped.chars().take_while(|c| *c == '`').count();
    (run >= 3).then(|| (run, stripped[run..].trim().is_empty()))
}

/// Fence state after `line`: the open fence length, or `None` outside code
fn next_fence_state(fence: Option<usize>, line: &str) -> Option<usize> {
    match (fence, fence_marker(line)) {
        (None, Some((run, _))) => Some(run),
        (Some(open), Some((run, true))) if run >= open => None,
        (state, _) => state,
    }
}

/// Deterministic Markdown layout
///
/// **Normalization Rules:**
/// 1. **Line Endings**: LF only
/// 2. **Blank Lines**: runs collapse to a single blank line
/// 3. **Trailing Whitespace**: removed from every line
/// 4. **Spaces**: runs collapse to one outside code; leading indentation kept
/// 5. **Fenced code**: lines kept verbatim apart from trailing whitespace
/// 6. **Edges**: leading and trailing whitespace of the document trimmed
pub(crate) fn normalize_output(output: &str) -> String {
    let output = output.replace("\r\n", "\n").replace('\r', "\n");
    let mut result = String::with_capacity(output.len());
    let mut fence: Option<usize> = None;
    let mut blank_pending = false;

    for line in output.lines() {
        let trimmed = line.trim_end();
        if fence.is_some() {
            result.push_str(trimmed);
            result.push('\n');
            fence = next_fence_state(fence, trimmed);
            continue;
        }

        if trimmed.is_empty() {
            blank_pending = !result.is_empty();
            continue;
        }
        if blank_pending {
            result.push('\n');
            blank_pending = false;
        }
        if fence_marker(trimmed).is_some() {
            result.push_str(trimmed);
        } else {
            result.push_str(&normalize_line_whitespace(trimmed));
        }
        result.push('\n');
        fence = next_fence_state(fence, trimmed);
    }

    result.trim().to_string()
}

/// Collapse space runs within a line
///
/// Leading spaces (list indentation) and spaces inside inline code spans
/// are preserved.
fn normalize_line_whitespace(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut prev_space = false;
    let mut at_start = true;
    let mut in_inline_code = false;

    for ch in line.chars() {
        if ch == '`' {
            in_inline_code = !in_inline_code;
            result.push(ch);
            prev_space = false;
            at_start = false;
        } else if ch == ' ' || ch == '\t' {
            if in_inline_code || at_start {
                result.push(ch);
            } else if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(ch);
            prev_space = false;
            at_start = false;
        }
    }

    result
}

/// Remove injected UI artifacts, then re-normalize the layout
pub(crate) fn strip_artifacts(patterns: &[Regex], markdown: &str) -> String {
    if patterns.is_empty() {
        return markdown.to_string();
    }
    let mut stripped = markdown.to_string();
    for pattern in patterns {
        if pattern.is_match(&stripped) {
            stripped = pattern.replace_all(&stripped, "").into_owned();
        }
    }
    normalize_output(&stripped)
}
