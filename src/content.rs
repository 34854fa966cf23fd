//! Main content selection
//!
//! Finds the subtree of a page that holds the article body and strips
//! boilerplate from the document before conversion. Selection walks a fixed
//! ladder, stopping at the first tier that yields a significant candidate:
//!
//! 1. Caller-supplied selectors, in the order given
//! 2. The built-in priority list of known article containers
//! 3. The largest text block among `div`, `section` and `article` elements
//! 4. `<body>` itself
//!
//! A candidate is significant when its word count exceeds the configured
//! threshold. Removal is a document mutation: the adapter's document no longer
//! contains the stripped nodes afterwards.

use serde::Serialize;
use tracing::debug;

use crate::dom::{DomAdapter, count_elements, count_words, has_ancestor, is_attached};
use crate::options::{ConversionOptions, DEFAULT_SIGNIFICANCE_THRESHOLD};

/// Known article containers, most specific first
pub const DEFAULT_PRIORITY_SELECTORS: &[&str] = &[
    ".entry-content",
    ".post-content",
    ".article-content",
    ".article-body",
    ".post-body",
    ".story-body",
    ".content-body",
    "[itemprop=articleBody]",
    "article",
    "main",
    "[role=main]",
    "#content",
    "#main-content",
    ".content",
    ".main-content",
    "#main",
    ".post",
    ".article",
];

/// Elements that never carry readable content, removed on every pass
const NON_CONTENT: &[&str] = &["script", "style", "noscript", "template"];

/// Boilerplate removed when `clean_html` is enabled
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "iframe",
    "nav",
    "aside",
    "[role=navigation]",
    "[role=banner]",
    "[role=contentinfo]",
    "[role=complementary]",
    "[aria-hidden=true]",
    "[hidden]",
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    "[class*=promo]",
    "[class*=social-share]",
    "[class*=share-buttons]",
    "[class*=sharing]",
    "[class*=newsletter]",
    "[class*=cookie]",
    "[class*=related-posts]",
    "[class*=related-articles]",
    "[class*=sidebar]",
    "[id*=sidebar]",
    "#comments",
    ".comments",
    ".comment-list",
    ".breadcrumb",
    ".breadcrumbs",
];

/// Page-level landmarks only removed outside article structure
const LANDMARK_EXCLUSIONS: &[&str] = &["header", "footer"];

/// Ancestors that make a header/footer part of the content
const SECTIONING_ANCESTORS: &[&str] = &[
    "article",
    "main",
    "section",
    "aside",
    "nav",
    "blockquote",
    "figure",
];

/// Elements eligible for the largest-block tier
const BLOCK_CANDIDATES: &str = "div, section, article";

/// How the content root was found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionTier {
    /// A caller-supplied selector matched
    Custom,
    /// A built-in article container matched
    Priority,
    /// Largest significant text block
    LargestBlock,
    /// Fell back to `<body>`
    #[default]
    Body,
    /// Nothing readable remained after cleaning
    Empty,
}

/// Selector lists and threshold driving content selection
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub priority: Vec<String>,
    pub exclusions: Vec<String>,
    pub significance_threshold: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        }
    }
}

/// Outcome of a selection pass
#[derive(Debug, Clone)]
pub struct ContentSelection<N> {
    /// Root of the extracted content
    pub root: N,
    pub tier: SelectionTier,
    /// Word count of the cleaned root
    pub word_count: usize,
    /// Element nodes in the document before cleaning
    pub original_nodes: usize,
    /// Element nodes removed by cleaning
    pub removed_nodes: usize,
}

pub struct ContentSelector {
    config: SelectorConfig,
}

impl ContentSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Clean the document and pick the content root
    ///
    /// `options.significance_threshold`, when set, overrides the configured
    /// threshold.
    pub fn select<A: DomAdapter>(
        &self,
        dom: &A,
        options: &ConversionOptions,
    ) -> ContentSelection<A::Node> {
        let threshold = options
            .significance_threshold
            .unwrap_or(self.config.significance_threshold);
        let document = dom.document();
        let original_nodes = count_elements(dom, &document);

        let removed_nodes = self.clean(dom, options);

        let found = self
            .first_significant(dom, options.custom_selectors.iter(), threshold)
            .map(|(root, words)| (root, words, SelectionTier::Custom))
            .or_else(|| {
                self.first_significant(dom, self.config.priority.iter(), threshold)
                    .map(|(root, words)| (root, words, SelectionTier::Priority))
            })
            .or_else(|| {
                largest_block(dom, threshold)
                    .map(|(root, words)| (root, words, SelectionTier::LargestBlock))
            });

        let (root, word_count, tier) = match found {
            Some(found) => found,
            None => {
                let body = dom.body();
                let words = count_words(dom, &body);
                let tier = if words == 0 {
                    SelectionTier::Empty
                } else {
                    SelectionTier::Body
                };
                (body, words, tier)
            }
        };

        debug!(?tier, word_count, original_nodes, removed_nodes, "content root selected");
        ContentSelection {
            root,
            tier,
            word_count,
            original_nodes,
            removed_nodes,
        }
    }

    /// Strip excluded subtrees; returns the number of element nodes removed
    ///
    /// Scripts, styles and templates go on every pass; the baseline
    /// boilerplate list only when `options.clean_html` is set.
    pub fn clean<A: DomAdapter>(&self, dom: &A, options: &ConversionOptions) -> usize {
        let document = dom.document();
        let mut removed = 0;

        let baseline: &[String] = if options.clean_html {
            self.config.exclusions.as_slice()
        } else {
            &[]
        };
        let selectors = NON_CONTENT
            .iter()
            .copied()
            .chain(options.exclude_selectors.iter().map(String::as_str))
            .chain(baseline.iter().map(String::as_str));
        for selector in selectors {
            for node in dom.query_all(&document, selector) {
                // Nested matches of an already detached subtree are gone too
                if !is_attached(dom, &node) {
                    continue;
                }
                removed += count_elements(dom, &node);
                dom.remove_node(&node);
            }
        }

        if options.clean_html {
            for tag in LANDMARK_EXCLUSIONS {
                for node in dom.query_all(&document, tag) {
                    if !is_attached(dom, &node) || has_ancestor(dom, &node, SECTIONING_ANCESTORS)
                    {
                        continue;
                    }
                    removed += count_elements(dom, &node);
                    dom.remove_node(&node);
                }
            }
        }
        removed
    }

    fn first_significant<'a, A: DomAdapter>(
        &self,
        dom: &A,
        selectors: impl Iterator<Item = &'a String>,
        threshold: usize,
    ) -> Option<(A::Node, usize)> {
        let document = dom.document();
        for selector in selectors {
            for candidate in dom.query_all(&document, selector) {
                let words = count_words(dom, &candidate);
                if words > threshold {
                    debug!(selector = selector.as_str(), words, "selector matched content");
                    return Some((candidate, words));
                }
            }
        }
        None
    }
}

impl Default for ContentSelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

/// Block with the most words among significant candidates
///
/// On equal counts the earlier block in document order wins, so an outer
/// wrapper beats the identical inner one.
fn largest_block<A: DomAdapter>(dom: &A, threshold: usize) -> Option<(A::Node, usize)> {
    let mut best: Option<(A::Node, usize)> = None;
    for candidate in dom.query_all(&dom.document(), BLOCK_CANDIDATES) {
        let words = count_words(dom, &candidate);
        if words <= threshold {
            continue;
        }
        if best.as_ref().is_none_or(|(_, best_words)| words > *best_words) {
            best = Some((candidate, words));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, LiveDocument};

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    fn options_with_threshold(threshold: usize) -> ConversionOptions {
        ConversionOptions {
            significance_threshold: Some(threshold),
            ..Default::default()
        }
    }

    #[test]
    fn test_entry_content_beats_main() {
        let html = format!(
            r#"<html><body><main><nav>{}</nav>
               <div class="entry-content"><p>{}</p></div></main></body></html>"#,
            words(40, "menu"),
            words(30, "story")
        );
        let dom = HtmlDocument::parse(&html).unwrap();
        let selection = ContentSelector::default().select(&dom, &options_with_threshold(20));

        assert_eq!(selection.tier, SelectionTier::Priority);
        assert_eq!(dom.attr(&selection.root, "class").as_deref(), Some("entry-content"));
        assert_eq!(selection.word_count, 30);
        assert!(!dom.text_of(&dom.document()).contains("menu"));
    }

    #[test]
    fn test_custom_selector_first() {
        let html = format!(
            r#"<body><article>{}</article><div id="story">{}</div></body>"#,
            words(60, "a"),
            words(60, "b")
        );
        let dom = HtmlDocument::parse(&html).unwrap();
        let options = ConversionOptions {
            custom_selectors: vec!["#story".to_string()],
            ..Default::default()
        };
        let selection = ContentSelector::default().select(&dom, &options);
        assert_eq!(selection.tier, SelectionTier::Custom);
        assert_eq!(dom.attr(&selection.root, "id").as_deref(), Some("story"));
    }

    #[test]
    fn test_insignificant_match_falls_through() {
        let html = format!(
            r#"<body><article>short teaser</article><div class="x"><div class="y">{}</div></div></body>"#,
            words(80, "body")
        );
        let dom = HtmlDocument::parse(&html).unwrap();
        let selection = ContentSelector::default().select(&dom, &ConversionOptions::default());
        assert_eq!(selection.tier, SelectionTier::LargestBlock);
        assert_eq!(dom.attr(&selection.root, "class").as_deref(), Some("x"));
    }

    #[test]
    fn test_body_fallback_and_empty() {
        let dom = HtmlDocument::parse("<body><p>just a few words</p></body>").unwrap();
        let selection = ContentSelector::default().select(&dom, &ConversionOptions::default());
        assert_eq!(selection.tier, SelectionTier::Body);
        assert_eq!(selection.word_count, 4);

        let dom = HtmlDocument::parse("<body><nav>only navigation</nav></body>").unwrap();
        let selection = ContentSelector::default().select(&dom, &ConversionOptions::default());
        assert_eq!(selection.tier, SelectionTier::Empty);
        assert_eq!(selection.word_count, 0);
    }

    #[test]
    fn test_landmarks_inside_article_survive() {
        let html = r#"<body><header>Site banner</header>
            <article><header><h1>Post title</h1></header><p>Text</p>
            <footer>Posted by Ann</footer></article>
            <footer>Copyright</footer></body>"#;
        let dom = HtmlDocument::parse(html).unwrap();
        ContentSelector::default().clean(&dom, &ConversionOptions::default());
        let text = dom.text_of(&dom.document());
        assert!(text.contains("Post title"));
        assert!(text.contains("Posted by Ann"));
        assert!(!text.contains("Site banner"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_exclude_selectors_apply_without_cleaning() {
        let html = r#"<body><p class="promo-box">Buy now</p><nav>Menu</nav><p>Text</p></body>"#;
        let dom = HtmlDocument::parse(html).unwrap();
        let options = ConversionOptions {
            clean_html: false,
            exclude_selectors: [".promo-box".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let removed = ContentSelector::default().clean(&dom, &options);
        assert_eq!(removed, 1);
        let text = dom.text_of(&dom.document());
        assert!(!text.contains("Buy now"));
        assert!(text.contains("Menu"));
    }

    #[test]
    fn test_scripts_removed_without_cleaning() {
        let html = "<body><script>var tracking = window.dataLayer || []; tracking.push(1);</script>\
                    <style>body { color: red }</style><noscript>Enable scripts</noscript></body>";
        let dom = HtmlDocument::parse(html).unwrap();
        let options = ConversionOptions {
            clean_html: false,
            ..Default::default()
        };
        let selection = ContentSelector::default().select(&dom, &options);
        assert_eq!(selection.tier, SelectionTier::Empty);
        assert_eq!(selection.word_count, 0);
        assert_eq!(selection.removed_nodes, 3);
    }

    #[test]
    fn test_minified_blocks_count_separately() {
        let html = format!(
            "<body><article><h1>Title</h1><p>one two</p><ul>{}</ul></article></body>",
            "<li>item</li>".repeat(20)
        );
        let dom = LiveDocument::parse(&html).unwrap();
        let selection = ContentSelector::default().select(&dom, &options_with_threshold(20));
        assert_eq!(selection.tier, SelectionTier::Priority);
        assert_eq!(selection.word_count, 23);
    }

    #[test]
    fn test_threshold_option_overrides_config() {
        let html = format!("<body><article><p>{}</p></article></body>", words(30, "w"));
        let config = SelectorConfig {
            significance_threshold: 10,
            ..Default::default()
        };
        let selector = ContentSelector::new(config);

        let dom = HtmlDocument::parse(&html).unwrap();
        let selection = selector.select(&dom, &ConversionOptions::default());
        assert_eq!(selection.tier, SelectionTier::Priority);

        let dom = HtmlDocument::parse(&html).unwrap();
        let selection = selector.select(&dom, &options_with_threshold(DEFAULT_SIGNIFICANCE_THRESHOLD));
        assert_eq!(selection.tier, SelectionTier::Body);
    }

    #[test]
    fn test_pseudo_class_selectors_match_on_both_backends() {
        let html = format!(
            r#"<body><div class="post teaser">{}</div><div class="post">{} full</div></body>"#,
            words(60, "teaser"),
            words(60, "story")
        );
        let options = ConversionOptions {
            custom_selectors: vec![".post:not(.teaser)".to_string()],
            ..Default::default()
        };

        let dom = HtmlDocument::parse(&html).unwrap();
        let selection = ContentSelector::default().select(&dom, &options);
        assert_eq!(selection.tier, SelectionTier::Custom);
        assert!(dom.text_of(&selection.root).ends_with("full"));

        let dom = LiveDocument::parse(&html).unwrap();
        let selection = ContentSelector::default().select(&dom, &options);
        assert_eq!(selection.tier, SelectionTier::Custom);
        assert!(dom.text_of(&selection.root).ends_with("full"));
    }

    #[test]
    fn test_removed_node_count() {
        let html = "<body><nav><ul><li>a</li><li>b</li></ul></nav><p>x</p></body>";
        let dom = LiveDocument::parse(html).unwrap();
        let selection = ContentSelector::default().select(&dom, &ConversionOptions::default());
        assert_eq!(selection.removed_nodes, 4);
        assert!(selection.original_nodes >= 7);
    }
}
