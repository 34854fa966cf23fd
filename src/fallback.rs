//! Conversion strategy chain and the plain-text fallback engine
//!
//! Strategies run in order until one succeeds. The rule engine comes first;
//! when it cannot be built or gives up on a document, the plain-text engine
//! still produces readable Markdown (headings and block text) from an
//! iterative walk that never recurses.

use std::fmt;

use tracing::warn;

use crate::converter::{ConversionStrategy, Rendered, RuleEngine, normalize_output};
use crate::dom::{DomAdapter, NodeKind, normalize_whitespace};
use crate::error::Result;
use crate::metadata::UrlResolver;
use crate::options::ConversionOptions;
use crate::security::SecurityValidator;

/// Elements whose text forms one Markdown paragraph
const TEXT_BLOCKS: &[&str] = &[
    "p",
    "li",
    "pre",
    "blockquote",
    "td",
    "th",
    "dt",
    "dd",
    "figcaption",
    "caption",
];

/// Iterative plain-text conversion
#[derive(Debug, Default)]
pub struct PlainTextEngine {
    security: SecurityValidator,
}

impl PlainTextEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversionStrategy for PlainTextEngine {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn convert<A: DomAdapter>(&self, dom: &A, root: &A::Node) -> Result<Rendered> {
        let mut blocks: Vec<String> = Vec::new();
        // Loose text directly inside containers joins into one block
        let mut loose = String::new();
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            match dom.kind(&node) {
                NodeKind::Element(tag) => {
                    if self.security.is_skipped_element(&tag) {
                        continue;
                    }
                    let heading_level = match tag.as_str() {
                        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                            Some((tag.as_bytes()[1] - b'0') as usize)
                        }
                        _ => None,
                    };
                    if heading_level.is_some() || TEXT_BLOCKS.contains(&tag.as_str()) {
                        flush(&mut blocks, &mut loose);
                        let text = normalize_whitespace(&dom.text_of(&node));
                        if text.is_empty() {
                            continue;
                        }
                        blocks.push(match heading_level {
                            Some(level) => format!("{} {}", "#".repeat(level), text),
                            None => text,
                        });
                    } else {
                        if tag != "br" && !is_inline(&tag) {
                            flush(&mut blocks, &mut loose);
                        }
                        stack.extend(dom.children(&node).into_iter().rev());
                    }
                }
                NodeKind::Text(text) => {
                    let text = normalize_whitespace(&text);
                    if !text.is_empty() {
                        if !loose.is_empty() {
                            loose.push(' ');
                        }
                        loose.push_str(&text);
                    }
                }
                NodeKind::Document => stack.extend(dom.children(&node).into_iter().rev()),
                NodeKind::Other => {}
            }
        }
        flush(&mut blocks, &mut loose);

        Ok(Rendered {
            markdown: normalize_output(&blocks.join("\n\n")),
            ..Default::default()
        })
    }
}

fn flush(blocks: &mut Vec<String>, loose: &mut String) {
    if !loose.is_empty() {
        blocks.push(std::mem::take(loose));
    }
}

fn is_inline(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "span" | "strong" | "b" | "em" | "i" | "code" | "small" | "abbr" | "mark" | "sub"
            | "sup" | "del" | "s" | "u" | "kbd" | "time" | "cite" | "q"
    )
}

/// Conversion strategies in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Rules,
    PlainText,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Rules => "rules",
            StrategyKind::PlainText => "plain-text",
        }
    }

    fn run<A: DomAdapter>(
        self,
        dom: &A,
        root: &A::Node,
        options: &ConversionOptions,
        resolver: &UrlResolver,
    ) -> Result<Rendered> {
        match self {
            StrategyKind::Rules => RuleEngine::new(options, resolver.clone())?.convert(dom, root),
            StrategyKind::PlainText => PlainTextEngine::new().convert(dom, root),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default chain: rule engine first, plain text as the safety net
pub const DEFAULT_STRATEGIES: &[StrategyKind] = &[StrategyKind::Rules, StrategyKind::PlainText];

/// How the strategy chain ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The first strategy succeeded
    Converted,
    /// A later strategy succeeded after earlier ones failed
    Degraded { reason: String },
    /// Every strategy failed
    Failed { reason: String },
}

/// Result of running the strategy chain
#[derive(Debug, Clone)]
pub struct ConversionRun {
    pub outcome: StrategyOutcome,
    /// Output of the succeeding strategy; empty when all failed
    pub rendered: Rendered,
    pub strategy: Option<StrategyKind>,
}

/// Run `strategies` in order, returning the first successful conversion
///
/// Each failure is logged at warn level and carried into the outcome's
/// reason.
pub fn convert_with_fallback<A: DomAdapter>(
    dom: &A,
    root: &A::Node,
    options: &ConversionOptions,
    resolver: &UrlResolver,
    strategies: &[StrategyKind],
) -> ConversionRun {
    let mut failures: Vec<String> = Vec::new();
    for &strategy in strategies {
        match strategy.run(dom, root, options, resolver) {
            Ok(rendered) => {
                let outcome = if failures.is_empty() {
                    StrategyOutcome::Converted
                } else {
                    StrategyOutcome::Degraded {
                        reason: failures.join("; "),
                    }
                };
                return ConversionRun {
                    outcome,
                    rendered,
                    strategy: Some(strategy),
                };
            }
            Err(err) => {
                warn!(strategy = strategy.name(), error = %err, "conversion strategy failed");
                failures.push(format!("{strategy}: {err}"));
            }
        }
    }

    let reason = if failures.is_empty() {
        "no conversion strategy configured".to_string()
    } else {
        failures.join("; ")
    };
    ConversionRun {
        outcome: StrategyOutcome::Failed { reason },
        rendered: Rendered::default(),
        strategy: None,
    }
}
