//! Extraction pipeline
//!
//! One [`Extractor::extract`] call runs every stage in sequence against a
//! document adapter:
//!
//! 1. Metadata and paywall markers are read from the original document
//! 2. The content selector strips boilerplate and picks the content root
//! 3. The quality scorer rates the cleaned root
//! 4. The strategy chain converts the root to Markdown
//! 5. The front matter block is assembled
//!
//! Every call returns fresh values; the extractor itself is never mutated.
//!
//! ```rust
//! use web_markdown_extractor::{ConversionOptions, ExtractionOutcome, extract_html};
//!
//! let html = "<html><body><article><h1>Hello</h1><p>Short body.</p></article></body></html>";
//! let extraction = extract_html(html, &ConversionOptions::default()).unwrap();
//! assert_eq!(extraction.outcome, ExtractionOutcome::Success);
//! assert!(extraction.conversion.markdown.starts_with("# Hello"));
//! ```

use tracing::{debug, info, info_span};

use crate::content::{ContentSelector, SelectionTier, SelectorConfig};
use crate::converter::Rendered;
use crate::dom::{DomAdapter, HtmlDocument, block_text};
use crate::error::Result;
use crate::fallback::{DEFAULT_STRATEGIES, StrategyKind, StrategyOutcome, convert_with_fallback};
use crate::frontmatter::{FrontmatterFields, FrontmatterGenerator};
use crate::metadata::{MetadataExtractor, PageMetadata, UrlResolver, first_text};
use crate::options::ConversionOptions;
use crate::quality::{QualityInput, QualityScorer, ScoringPolicy};
use crate::reading_time::ReadingTimeEstimator;
use crate::result::{ConversionResult, Extraction, ExtractionOutcome, ExtractionResult};

/// Configured extraction pipeline
pub struct Extractor {
    options: ConversionOptions,
    selector: ContentSelector,
    scorer: QualityScorer,
    frontmatter: FrontmatterGenerator,
    reading_time: ReadingTimeEstimator,
    strategies: Vec<StrategyKind>,
}

impl Extractor {
    pub fn new(options: ConversionOptions) -> Self {
        Self::with_policies(options, SelectorConfig::default(), ScoringPolicy::default())
    }

    /// Extractor with custom selection and scoring policies
    pub fn with_policies(
        options: ConversionOptions,
        selector_config: SelectorConfig,
        scoring_policy: ScoringPolicy,
    ) -> Self {
        Self {
            options,
            selector: ContentSelector::new(selector_config),
            scorer: QualityScorer::new(scoring_policy),
            frontmatter: FrontmatterGenerator::new(),
            reading_time: ReadingTimeEstimator::new(),
            strategies: DEFAULT_STRATEGIES.to_vec(),
        }
    }

    /// Replace the conversion strategy chain
    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Run the whole pipeline against `dom`
    ///
    /// Boilerplate removal edits the adapter's document in place.
    pub fn extract<A: DomAdapter>(&self, dom: &A) -> Extraction {
        let span = info_span!("extract", base_url = ?self.options.base_url);
        let _guard = span.enter();

        let resolver = UrlResolver::for_document(dom, self.options.base_url.as_deref());
        let mut metadata = MetadataExtractor::new(resolver.clone()).extract(dom);
        let paywall_markers = self.scorer.count_paywall_markers(dom);

        let selection = self.selector.select(dom, &self.options);
        metadata.prefer_heading(first_text(dom, &selection.root, "h1"));

        let word_count = selection.word_count;
        let reading_time_minutes = self.reading_time.minutes(word_count);
        let content_text = block_text(dom, &selection.root);
        let report = self.scorer.score(&QualityInput {
            original_nodes: selection.original_nodes,
            removed_nodes: selection.removed_nodes,
            word_count,
            tier: selection.tier,
            paywall_markers,
            title: metadata.title.as_deref(),
            ..QualityInput::measure(dom, &selection.root, &content_text)
        });
        debug!(
            quality_score = report.quality_score,
            paywall = report.is_paywall_present,
            "content scored"
        );

        let (outcome, rendered) = if selection.tier == SelectionTier::Empty {
            (ExtractionOutcome::Empty, minimal_output(&metadata))
        } else {
            let run = convert_with_fallback(
                dom,
                &selection.root,
                &self.options,
                &resolver,
                &self.strategies,
            );
            match run.outcome {
                StrategyOutcome::Converted => (ExtractionOutcome::Success, run.rendered),
                StrategyOutcome::Degraded { reason } => {
                    (ExtractionOutcome::Degraded { reason }, run.rendered)
                }
                StrategyOutcome::Failed { reason } => {
                    (ExtractionOutcome::Failed { reason }, minimal_output(&metadata))
                }
            }
        };

        let frontmatter = if self.options.generate_frontmatter {
            let url = metadata
                .canonical_url
                .as_deref()
                .or(self.options.base_url.as_deref());
            self.frontmatter.generate(&FrontmatterFields {
                title: metadata.title.as_deref(),
                url,
                captured: self.options.captured_at,
                author: metadata.author.as_deref(),
                published: metadata.published.as_deref(),
                description: metadata.description.as_deref(),
                tags: &metadata.tags,
                word_count: Some(word_count),
                reading_time_minutes: Some(reading_time_minutes),
            })
        } else {
            String::new()
        };

        let mut result = ExtractionResult {
            content_html: dom.inner_html_of(&selection.root),
            images: rendered.images,
            links: rendered.links,
            word_count,
            reading_time_minutes,
            quality_score: report.quality_score,
            is_paywall_present: report.is_paywall_present,
            confidence: selection.tier,
            ..Default::default()
        };
        if self.options.include_metadata {
            result.title = metadata.title;
            result.author = metadata.author;
            result.published_date = metadata.published;
            result.description = metadata.description;
            result.site_name = metadata.site_name;
            result.canonical_url = metadata.canonical_url;
            result.tags = metadata.tags;
            result.og_tags = metadata.og_tags;
        }

        info!(
            outcome = ?outcome,
            tier = ?selection.tier,
            word_count,
            quality_score = result.quality_score,
            "extraction finished"
        );
        Extraction {
            outcome,
            result,
            conversion: ConversionResult {
                markdown: rendered.markdown,
                frontmatter,
                word_count,
                reading_time_minutes,
            },
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ConversionOptions::default())
    }
}

/// Title-only Markdown for documents without convertible content
fn minimal_output(metadata: &PageMetadata) -> Rendered {
    let markdown = metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(|title| format!("# {title}"))
        .unwrap_or_default();
    Rendered {
        markdown,
        ..Default::default()
    }
}

/// Parse an HTML string and extract it
///
/// The parsed document lives only for the duration of the call.
pub fn extract_html(html: &str, options: &ConversionOptions) -> Result<Extraction> {
    let dom = HtmlDocument::parse(html)?;
    Ok(Extractor::new(options.clone()).extract(&dom))
}

/// Decode raw bytes (charset from `content_type` or `<meta>`) and extract
pub fn extract_bytes(
    bytes: &[u8],
    content_type: Option<&str>,
    options: &ConversionOptions,
) -> Result<Extraction> {
    let dom = HtmlDocument::parse_bytes(bytes, content_type)?;
    Ok(Extractor::new(options.clone()).extract(&dom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LiveDocument;
    use chrono::TimeZone;

    fn fixed_options() -> ConversionOptions {
        ConversionOptions {
            captured_at: Some(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_document() {
        let extraction = extract_html("", &fixed_options()).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Empty);
        assert_eq!(extraction.result.quality_score, 0.0);
        assert!(!extraction.result.is_paywall_present);
        assert_eq!(extraction.result.confidence, SelectionTier::Empty);
        assert_eq!(extraction.conversion.markdown, "");
        assert!(extraction.conversion.frontmatter.contains("title: \"Untitled\""));
        assert!(extraction.conversion.frontmatter.contains("url: \"unknown\""));
    }

    #[test]
    fn test_empty_body_keeps_title() {
        let html = "<html><head><title>Only a title</title></head><body><nav>menu</nav></body></html>";
        let extraction = extract_html(html, &fixed_options()).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Empty);
        assert_eq!(extraction.conversion.markdown, "# Only a title");
    }

    #[test]
    fn test_metadata_toggle() {
        let html = r#"<html><head><meta name="author" content="Ann"></head>
            <body><p>Words here</p></body></html>"#;
        let with = extract_html(html, &fixed_options()).unwrap();
        assert_eq!(with.result.author.as_deref(), Some("Ann"));

        let options = ConversionOptions {
            include_metadata: false,
            generate_frontmatter: false,
            ..fixed_options()
        };
        let without = extract_html(html, &options).unwrap();
        assert_eq!(without.result.author, None);
        assert!(without.conversion.frontmatter.is_empty());
        assert_eq!(without.conversion.to_document(), "Words here");
    }

    #[test]
    fn test_live_document_is_cleaned_in_place() {
        let html = "<html><body><nav>menu</nav><article><p>Kept text</p></article></body></html>";
        let dom = LiveDocument::parse(html).unwrap();
        let extraction = Extractor::new(fixed_options()).extract(&dom);
        assert_eq!(extraction.conversion.markdown, "Kept text");
        let document = dom.into_inner();
        assert!(!document.root_element().html().contains("menu"));
    }

    #[test]
    fn test_failed_chain_returns_minimal_output() {
        let options = ConversionOptions {
            strip_patterns: vec!["(".to_string()],
            ..fixed_options()
        };
        let dom = HtmlDocument::parse("<title>T</title><p>body text</p>").unwrap();
        let extraction = Extractor::new(options)
            .with_strategies(vec![StrategyKind::Rules])
            .extract(&dom);
        assert!(matches!(extraction.outcome, ExtractionOutcome::Failed { .. }));
        assert_eq!(extraction.conversion.markdown, "# T");
    }

    #[test]
    fn test_minified_word_count_matches_markdown() {
        let html = "<h1>Title</h1><p>one two</p><ul><li>alpha</li><li>beta</li></ul>";
        let extraction = extract_html(html, &fixed_options()).unwrap();
        assert_eq!(
            extraction.conversion.markdown,
            "# Title\n\none two\n\n- alpha\n- beta"
        );
        assert_eq!(extraction.conversion.word_count, 5);
        assert!(extraction.conversion.frontmatter.contains("wordCount: 5\n"));
    }

    #[test]
    fn test_script_only_page_without_cleaning_is_empty() {
        let options = ConversionOptions {
            clean_html: false,
            ..fixed_options()
        };
        let html = "<body><script>var tracking = window.dataLayer || []; tracking.push(1);</script></body>";
        let extraction = extract_html(html, &options).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Empty);
        assert_eq!(extraction.result.quality_score, 0.0);
        assert_eq!(extraction.result.word_count, 0);
        assert_eq!(extraction.conversion.markdown, "");
    }

    #[test]
    fn test_malformed_bytes() {
        let err = extract_bytes(
            b"<p>caf\xe9</p>",
            Some("text/html; charset=utf-8"),
            &fixed_options(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "malformed_input");
    }
}
