//! Extraction confidence scoring and paywall detection
//!
//! The score blends four signals, each normalised to [0, 1]:
//!
//! - share of the text that sits inside paragraphs
//! - heading structure (present, and no skipped levels going deeper)
//! - how much of the page had to be stripped as boilerplate
//! - body length relative to a typical article
//!
//! The blend is scaled by how the content root was found and halved when a
//! paywall signal fires. Scoring never blocks an extraction.

use regex::Regex;
use tracing::warn;

use crate::content::SelectionTier;
use crate::dom::{DomAdapter, NodeKind, word_count};

/// Text phrases typical of a truncated, subscriber-only article
pub const DEFAULT_PAYWALL_PATTERNS: &[&str] = &[
    r"(?i)subscribe (now )?to (continue|keep) reading",
    r"(?i)already a subscriber\??",
    r"(?i)to continue reading,? (please )?(subscribe|log in|sign in)",
    r"(?i)(this|the rest of this) (article|story|content) is (only )?(available|reserved) (to|for) (subscribers|members)",
    r"(?i)for subscribers only",
    r"(?i)sign in to (read|continue)",
    r"(?i)premium content",
    r"(?i)create a free account to (read|continue)",
];

/// Markup left by common paywall widgets
pub const DEFAULT_PAYWALL_SELECTORS: &[&str] = &[
    ".paywall",
    "[class*=paywall]",
    "[id*=paywall]",
    "[data-paywall]",
    ".subscriber-only",
    ".premium-content",
    "[class*=meter-]",
];

/// Weights and thresholds of the quality heuristic
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    pub paragraph_weight: f64,
    pub structure_weight: f64,
    pub cleanliness_weight: f64,
    pub length_weight: f64,
    /// Word count at which the length signal saturates
    pub ideal_word_count: usize,
    pub paywall_patterns: Vec<String>,
    pub paywall_selectors: Vec<String>,
    /// Bodies shorter than this count as short for the teaser check
    pub short_body_words: usize,
    /// Titles longer than this count as long for the teaser check
    pub long_title_chars: usize,
    /// Also require the body to end in a truncation mark ("..." or "…")
    pub teaser_requires_ellipsis: bool,
    /// Multiplier applied when the score carries a paywall signal
    pub paywall_factor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            paragraph_weight: 0.35,
            structure_weight: 0.15,
            cleanliness_weight: 0.15,
            length_weight: 0.35,
            ideal_word_count: 300,
            paywall_patterns: DEFAULT_PAYWALL_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            paywall_selectors: DEFAULT_PAYWALL_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            short_body_words: 80,
            long_title_chars: 60,
            teaser_requires_ellipsis: false,
            paywall_factor: 0.5,
        }
    }
}

/// Measurements of an extracted subtree fed to the scorer
#[derive(Debug, Clone, Default)]
pub struct QualityInput<'a> {
    /// Characters of non-whitespace text inside `<p>` elements
    pub paragraph_text_len: usize,
    /// Characters of non-whitespace text in the whole root
    pub total_text_len: usize,
    /// Heading levels (1-6) in document order
    pub heading_levels: Vec<u8>,
    pub original_nodes: usize,
    pub removed_nodes: usize,
    pub word_count: usize,
    pub tier: SelectionTier,
    /// Paywall markers found in the document before cleaning
    pub paywall_markers: usize,
    pub title: Option<&'a str>,
    /// Text of the content root with blocks separated, as from
    /// [`crate::dom::block_text`]
    pub content_text: &'a str,
}

impl<'a> QualityInput<'a> {
    /// Measure the text layout of `root`
    pub fn measure<A: DomAdapter>(dom: &A, root: &A::Node, content_text: &'a str) -> Self {
        let mut input = QualityInput {
            total_text_len: text_len(content_text),
            word_count: word_count(content_text),
            content_text,
            ..Default::default()
        };

        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let NodeKind::Element(tag) = dom.kind(&node) else {
                stack.extend(dom.children(&node).into_iter().rev());
                continue;
            };
            match tag.as_str() {
                "p" => input.paragraph_text_len += text_len(&dom.text_of(&node)),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    input.heading_levels.push(tag.as_bytes()[1] - b'0');
                }
                _ => stack.extend(dom.children(&node).into_iter().rev()),
            }
        }
        input
    }
}

/// Score and paywall verdict for one extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityReport {
    pub quality_score: f64,
    pub is_paywall_present: bool,
}

pub struct QualityScorer {
    policy: ScoringPolicy,
    patterns: Vec<Regex>,
}

impl QualityScorer {
    /// Build a scorer; invalid paywall patterns are logged and skipped
    pub fn new(policy: ScoringPolicy) -> Self {
        let patterns = policy
            .paywall_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern = pattern.as_str(), %err, "skipping invalid paywall pattern");
                    None
                }
            })
            .collect();
        Self { policy, patterns }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Count paywall widget markers in the (uncleaned) document
    pub fn count_paywall_markers<A: DomAdapter>(&self, dom: &A) -> usize {
        let document = dom.document();
        self.policy
            .paywall_selectors
            .iter()
            .map(|selector| dom.query_all(&document, selector).len())
            .sum()
    }

    pub fn score(&self, input: &QualityInput<'_>) -> QualityReport {
        if input.word_count == 0 || input.total_text_len == 0 || input.tier == SelectionTier::Empty
        {
            return QualityReport {
                quality_score: 0.0,
                is_paywall_present: false,
            };
        }

        let policy = &self.policy;
        let paragraph = ratio(input.paragraph_text_len, input.total_text_len);
        let structure = heading_structure(&input.heading_levels);
        let cleanliness = 1.0 - ratio(input.removed_nodes, input.original_nodes);
        let length = ratio(input.word_count, policy.ideal_word_count.max(1));

        let total_weight = policy.paragraph_weight
            + policy.structure_weight
            + policy.cleanliness_weight
            + policy.length_weight;
        let blended = if total_weight > 0.0 {
            (paragraph * policy.paragraph_weight
                + structure * policy.structure_weight
                + cleanliness * policy.cleanliness_weight
                + length * policy.length_weight)
                / total_weight
        } else {
            0.0
        };

        let is_paywall_present = self.detect_paywall(input);
        let mut score = blended * tier_factor(input.tier);
        if is_paywall_present {
            score *= policy.paywall_factor;
        }

        QualityReport {
            quality_score: if score.is_finite() {
                score.clamp(0.0, 1.0)
            } else {
                0.0
            },
            is_paywall_present,
        }
    }

    fn detect_paywall(&self, input: &QualityInput<'_>) -> bool {
        if input.paywall_markers > 0 {
            return true;
        }
        if self.patterns.iter().any(|regex| regex.is_match(input.content_text)) {
            return true;
        }
        // Teaser: a headline promising an article over a short stub
        let title_len = input.title.map_or(0, |title| title.chars().count());
        let teaser = input.word_count < self.policy.short_body_words
            && title_len > self.policy.long_title_chars;
        if !teaser || !self.policy.teaser_requires_ellipsis {
            return teaser;
        }
        let trimmed = input.content_text.trim_end();
        trimmed.ends_with("...") || trimmed.ends_with('…')
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn text_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).min(1.0)
}

/// 1.0 for a well-formed outline, lower when levels are skipped or absent
fn heading_structure(levels: &[u8]) -> f64 {
    if levels.is_empty() {
        return 0.4;
    }
    let skips = levels
        .windows(2)
        .filter(|pair| pair[1] > pair[0] + 1)
        .count();
    if skips == 0 { 1.0 } else { 0.7 }
}

fn tier_factor(tier: SelectionTier) -> f64 {
    match tier {
        SelectionTier::Custom | SelectionTier::Priority => 1.0,
        SelectionTier::LargestBlock => 0.85,
        SelectionTier::Body => 0.6,
        SelectionTier::Empty => 0.0,
    }
}
