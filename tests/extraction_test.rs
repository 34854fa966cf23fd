//! End-to-end extraction tests
//!
//! Every test drives the public entry points (`extract_html`, `extract_bytes`,
//! `Extractor::extract`) the way an embedding application would.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use web_markdown_extractor::dom::DomAdapter;
use web_markdown_extractor::{
    ConversionOptions, ExtractionOutcome, Extractor, HtmlDocument, LiveDocument, SelectionTier,
    extract_bytes, extract_html,
};

fn captured() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
}

fn options() -> ConversionOptions {
    ConversionOptions {
        captured_at: Some(captured()),
        ..Default::default()
    }
}

fn words(n: usize, word: &str) -> String {
    vec![word; n].join(" ")
}

#[test]
fn test_basic_article_scenario() {
    let html = r#"<main><h1>Test Article</h1><p>This is a <strong>test</strong> paragraph with <a href="https://example.com">a link</a>.</p><img src="https://example.com/image.png" alt="Test Image"></main>"#;

    let extraction = extract_html(html, &ConversionOptions::default()).expect("parse");
    let markdown = &extraction.conversion.markdown;

    assert_eq!(extraction.outcome, ExtractionOutcome::Success);
    assert!(markdown.contains("# Test Article"), "{markdown}");
    assert!(markdown.contains("[a link](https://example.com)"), "{markdown}");
    assert!(markdown.contains("**test**"), "{markdown}");
    assert!(
        extraction
            .result
            .images
            .iter()
            .any(|image| image.src == "https://example.com/image.png")
    );
    assert_eq!(extraction.result.title.as_deref(), Some("Test Article"));
}

#[test]
fn test_boilerplate_is_removed() {
    let html = format!(
        r#"<html><head><title>Site | Story</title></head><body>
            <header><a href="/">Home</a> <a href="/news">News</a></header>
            <nav><ul><li>Section one</li><li>Section two</li></ul></nav>
            <article>
              <h1>Story</h1>
              <p>{}</p>
              <div class="share-buttons">Share on everything</div>
              <p>{}</p>
            </article>
            <aside class="sidebar">Trending now</aside>
            <div class="newsletter-signup">Join the newsletter</div>
            <footer>Copyright notice</footer>
        </body></html>"#,
        words(40, "alpha"),
        words(40, "beta")
    );

    let extraction = extract_html(&html, &options()).expect("parse");
    let markdown = &extraction.conversion.markdown;

    assert_eq!(extraction.result.confidence, SelectionTier::Priority);
    assert!(markdown.starts_with("# Story\n\nalpha"), "{markdown}");
    for noise in [
        "Home",
        "Section one",
        "Share on",
        "Trending",
        "newsletter",
        "Copyright",
    ] {
        assert!(!markdown.contains(noise), "{noise} leaked into {markdown}");
    }
    assert_eq!(extraction.result.word_count, 81);
    assert!(extraction.result.quality_score > 0.0);
    assert!(extraction.result.quality_score <= 1.0);
}

#[test]
fn test_entry_content_preferred_over_main() {
    let html = format!(
        r#"<html><body>
            <main><nav>{}</nav><p>{}</p></main>
            <div class="entry-content"><p>{}</p></div>
        </body></html>"#,
        words(20, "menu"),
        words(10, "intro"),
        words(30, "story")
    );
    let options = ConversionOptions {
        significance_threshold: Some(20),
        ..options()
    };

    let extraction = extract_html(&html, &options).expect("parse");

    assert_eq!(extraction.result.confidence, SelectionTier::Priority);
    assert_eq!(extraction.conversion.markdown, words(30, "story"));
    assert_eq!(extraction.result.word_count, 30);
}

#[test]
fn test_custom_selector_wins() {
    let html = format!(
        r#"<html><body><article><p>{}</p></article><section id="story"><p>{}</p></section></body></html>"#,
        words(80, "article"),
        words(60, "custom")
    );
    let options = ConversionOptions {
        custom_selectors: vec!["#story".to_string()],
        ..options()
    };

    let extraction = extract_html(&html, &options).expect("parse");

    assert_eq!(extraction.result.confidence, SelectionTier::Custom);
    assert_eq!(extraction.conversion.markdown, words(60, "custom"));
}

#[test]
fn test_code_block_languages() {
    let html = r#"<html><body>
        <pre><code class="language-python">x = 1</code></pre>
        <pre><code>def foo():
    return 1</code></pre>
        <pre>nothing recognizable here</pre>
    </body></html>"#;

    let extraction = extract_html(html, &options()).expect("parse");
    let markdown = &extraction.conversion.markdown;

    assert_eq!(
        markdown,
        "```python\nx = 1\n```\n\n\
         ```python\ndef foo():\n    return 1\n```\n\n\
         ```\nnothing recognizable here\n```"
    );
}

#[test]
fn test_frontmatter_placeholders() {
    let html = "<html><head><title></title></head><body><p>Some words here</p></body></html>";

    let extraction = extract_html(html, &options()).expect("parse");
    let frontmatter = &extraction.conversion.frontmatter;

    assert!(frontmatter.starts_with("---\n"));
    assert!(frontmatter.ends_with("---\n"));
    assert!(frontmatter.contains("title: \"Untitled\"\n"));
    assert!(frontmatter.contains("url: \"unknown\"\n"));
    assert!(frontmatter.contains("captured: \"2024-03-09T12:00:00Z\"\n"));
    assert_eq!(
        extraction.conversion.to_document(),
        format!("{frontmatter}\nSome words here\n")
    );
}

#[test]
fn test_frontmatter_metadata() {
    let html = r#"<html><head>
        <title>Fallback title</title>
        <meta property="og:title" content="Shared title">
        <meta name="author" content="Jane Doe">
        <meta name="description" content="What the page is about">
        <meta property="article:published_time" content="2024-02-01T08:00:00Z">
        <meta name="keywords" content="rust, parsing">
        <link rel="canonical" href="https://example.com/canonical">
    </head><body><p>Body text</p></body></html>"#;
    let options = ConversionOptions {
        base_url: Some("https://example.com/fetched?utm=1".to_string()),
        ..options()
    };

    let extraction = extract_html(html, &options).expect("parse");
    let frontmatter = &extraction.conversion.frontmatter;

    assert!(frontmatter.contains("url: \"https://example.com/canonical\"\n"));
    assert!(frontmatter.contains("author: \"Jane Doe\"\n"));
    assert!(frontmatter.contains("description: \"What the page is about\"\n"));
    assert!(frontmatter.contains("published: \"2024-02-01T08:00:00Z\"\n"));
    assert!(frontmatter.contains("tags: [\"rust\", \"parsing\"]\n"));
    assert!(frontmatter.contains("wordCount: 2\n"));
    assert_eq!(
        extraction.result.canonical_url.as_deref(),
        Some("https://example.com/canonical")
    );
    assert_eq!(
        extraction.result.og_tags.get("og:title").map(String::as_str),
        Some("Shared title")
    );
}

#[test]
fn test_empty_document_scores_zero() {
    for html in ["", "<html><body></body></html>", "<p>   </p>"] {
        let extraction = extract_html(html, &options()).expect("parse");
        assert_eq!(extraction.outcome, ExtractionOutcome::Empty);
        assert_eq!(extraction.result.quality_score, 0.0);
        assert!(!extraction.result.is_paywall_present);
        assert_eq!(extraction.result.word_count, 0);
    }
}

#[test]
fn test_depth_limit_degrades_to_plain_text() {
    let html = format!(
        "<html><body>{}<p>deep <em>text</em></p>{}</body></html>",
        "<div>".repeat(40),
        "</div>".repeat(40)
    );
    let options = ConversionOptions {
        max_depth: 10,
        ..options()
    };

    let extraction = extract_html(&html, &options).expect("parse");

    match &extraction.outcome {
        ExtractionOutcome::Degraded { reason } => assert!(reason.starts_with("rules:"), "{reason}"),
        other => panic!("expected degraded outcome, got {other:?}"),
    }
    assert_eq!(extraction.conversion.markdown, "deep text");
}

#[test]
fn test_paywall_detected() {
    let html = format!(
        r#"<html><body><article><h1>Breaking</h1><p>{}</p>
            <div class="paywall"><p>Subscribe to continue reading.</p></div>
        </article></body></html>"#,
        words(60, "lead")
    );

    let extraction = extract_html(&html, &options()).expect("parse");

    assert!(extraction.result.is_paywall_present);
    assert!(extraction.result.quality_score > 0.0);
    assert!(extraction.result.quality_score <= 0.5);
}

#[test]
fn test_teaser_without_markers_is_paywalled() {
    let title = "An extraordinarily long headline promising far more than the page delivers";
    let html = format!(
        "<html><head><title>{title}</title></head><body><p>Only the opening lines are shown here...</p></body></html>"
    );

    let extraction = extract_html(&html, &options()).expect("parse");

    assert!(extraction.result.is_paywall_present);
}

#[test]
fn test_open_article_is_not_paywalled() {
    let html = format!(
        "<html><body><article><h1>Open</h1><p>{}</p></article></body></html>",
        words(120, "free")
    );

    let extraction = extract_html(&html, &options()).expect("parse");

    assert!(!extraction.result.is_paywall_present);
}

#[test]
fn test_windows_1252_bytes() {
    let bytes = b"<html><head><meta charset=\"windows-1252\"></head><body><p>caf\xe9 cr\xe8me</p></body></html>";

    let extraction = extract_bytes(bytes, None, &options()).expect("decode");

    assert_eq!(extraction.conversion.markdown, "caf\u{e9} cr\u{e8}me");
}

#[test]
fn test_content_type_charset_wins() {
    let bytes = b"<p>na\xefve</p>";

    let extraction =
        extract_bytes(bytes, Some("text/html; charset=ISO-8859-1"), &options()).expect("decode");

    assert_eq!(extraction.conversion.markdown, "na\u{ef}ve");
}

#[test]
fn test_backends_produce_the_same_extraction() {
    let html = format!(
        r#"<html><head><title>Both</title></head><body>
            <nav>skip me</nav>
            <article>
              <h2>Heading</h2>
              <p>{} <a href="/rel">link</a> <img src="/pic.png" alt="pic"></p>
              <ul><li>one</li><li>two</li></ul>
              <table><tr><th>k</th><th>v</th></tr><tr><td>a</td><td>1</td></tr></table>
            </article>
        </body></html>"#,
        words(60, "shared")
    );
    let options = ConversionOptions {
        base_url: Some("https://example.com/post/".to_string()),
        ..options()
    };
    let extractor = Extractor::new(options);

    let constructed = HtmlDocument::parse(&html).expect("parse");
    let live = LiveDocument::parse(&html).expect("parse");
    let from_constructed = extractor.extract(&constructed);
    let from_live = extractor.extract(&live);

    assert_eq!(from_constructed.outcome, from_live.outcome);
    assert_eq!(from_constructed.conversion, from_live.conversion);
    assert_eq!(from_constructed.result.images, from_live.result.images);
    assert_eq!(from_constructed.result.links, from_live.result.links);
    assert_eq!(from_constructed.result.word_count, from_live.result.word_count);
    assert_eq!(from_constructed.result.confidence, from_live.result.confidence);
    assert!((from_constructed.result.quality_score - from_live.result.quality_score).abs() < 1e-9);
    assert_eq!(from_constructed.result.links[0].href, "https://example.com/rel");
}

#[test]
fn test_options_loaded_from_json() {
    let options: ConversionOptions = serde_json::from_str(
        r#"{
            "includeLinks": false,
            "includeImages": false,
            "generateFrontmatter": false
        }"#,
    )
    .expect("options json");

    let html = r#"<p>Read <a href="https://example.com">this</a> <img src="/a.png" alt="a"></p>"#;
    let extraction = extract_html(html, &options).expect("parse");

    assert_eq!(extraction.conversion.markdown, "Read this");
    assert!(extraction.conversion.frontmatter.is_empty());
    assert!(extraction.result.images.is_empty());
}

#[test]
fn test_extraction_serializes_camel_case() {
    let extraction = extract_html("<h1>T</h1>\n<p>x y</p>", &options()).expect("parse");
    let value = serde_json::to_value(&extraction).expect("serialize");

    assert_eq!(value["outcome"]["status"], "success");
    assert_eq!(value["result"]["wordCount"], 3);
    assert_eq!(value["result"]["isPaywallPresent"], false);
    assert_eq!(value["conversion"]["markdown"], "# T\n\nx y");
}

#[test]
fn test_live_document_mutation_is_visible_to_caller() {
    let dom = LiveDocument::parse(
        r#"<html><body><div class="advertisement">Buy now</div><p>Kept</p></body></html>"#,
    )
    .expect("parse");

    let extraction = Extractor::new(options()).extract(&dom);

    assert_eq!(extraction.conversion.markdown, "Kept");
    assert!(dom.query(&dom.document(), ".advertisement").is_none());
}

fn build_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for cell in header {
        html.push_str(&format!("<th>{cell}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn table_strategy() -> impl Strategy<Value = (Vec<String>, Vec<Vec<String>>)> {
    (1usize..6).prop_flat_map(|columns| {
        (
            prop::collection::vec("[a-z]{1,8}", columns),
            prop::collection::vec(prop::collection::vec("[a-z]{1,8}", columns), 1..8),
        )
    })
}

proptest! {
    #[test]
    fn prop_table_shape((header, rows) in table_strategy()) {
        let html = format!("<html><body>{}</body></html>", build_table(&header, &rows));
        let extraction = extract_html(&html, &options()).expect("parse");
        let lines: Vec<&str> = extraction.conversion.markdown.lines().collect();

        // header, separator, then one line per data row
        prop_assert_eq!(lines.len(), rows.len() + 2);
        for line in &lines {
            prop_assert!(line.starts_with('|') && line.ends_with('|'));
            prop_assert_eq!(line.matches('|').count(), header.len() + 1);
        }
        prop_assert!(lines[1].split('|').filter(|cell| !cell.is_empty()).all(|cell| cell.trim() == "---"));
    }

    #[test]
    fn prop_heading_and_paragraph_in_source_order(
        heading in "[A-Za-z][A-Za-z0-9 ]{0,30}",
        paragraph in "[A-Za-z][A-Za-z0-9 ]{0,80}",
    ) {
        let html = format!("<html><body><h2>{heading}</h2><p>{paragraph}</p></body></html>");
        let extraction = extract_html(&html, &options()).expect("parse");
        let markdown = &extraction.conversion.markdown;

        let heading_text = heading.split_whitespace().collect::<Vec<_>>().join(" ");
        let paragraph_text = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        let heading_at = markdown.find(&format!("## {heading_text}"));
        prop_assert!(heading_at.is_some(), "{}", markdown);
        let paragraph_at = markdown.rfind(&paragraph_text);
        prop_assert!(paragraph_at.is_some(), "{}", markdown);
        prop_assert!(heading_at < paragraph_at);
    }
}
