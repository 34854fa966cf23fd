//! Page metadata extraction and URL resolution
//!
//! Metadata is read from the original document, before boilerplate removal,
//! because the nodes carrying it (`<head>`, site headers, bylines) are exactly
//! what cleaning strips.
//!
//! # Title Resolution
//!
//! The first non-empty candidate wins:
//!
//! 1. First `<h1>` of the selected content (applied by the pipeline)
//! 2. First `<h1>` of the document
//! 3. `<meta name="title">`
//! 4. `og:title`, then `twitter:title`
//! 5. `<title>`
//!
//! # URL Resolution
//!
//! Relative URLs are resolved against the document base: the `<base href>`
//! of the page joined onto the caller-supplied document URL. Absolute URLs are
//! kept exactly as written.
//!
//! ```rust
//! use web_markdown_extractor::metadata::UrlResolver;
//!
//! let resolver = UrlResolver::new(Some("https://example.com/blog/post"));
//! assert_eq!(resolver.resolve("../about"), "https://example.com/about");
//! assert_eq!(resolver.resolve("https://other.org"), "https://other.org");
//! assert!(resolver.is_external("https://other.org/x"));
//! ```

use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::dom::{DomAdapter, normalize_whitespace};

/// Longest byline text accepted from a `.byline`/`.author` element
const MAX_BYLINE_CHARS: usize = 100;

/// Metadata resolved from a document
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub canonical_url: Option<String>,
    /// Keywords and `article:tag` values, deduplicated in document order
    pub tags: Vec<String>,
    /// Every `og:*` property; the first occurrence of a key wins
    pub og_tags: BTreeMap<String, String>,
}

impl PageMetadata {
    /// Let a heading from the selected content take precedence as title
    pub fn prefer_heading(&mut self, heading: Option<String>) {
        if let Some(heading) = heading.filter(|h| !h.is_empty()) {
            self.title = Some(heading);
        }
    }
}

/// Resolves link targets against the document base URL
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    base: Option<Url>,
}

impl UrlResolver {
    pub fn new(base_url: Option<&str>) -> Self {
        let base = base_url.and_then(|raw| match Url::parse(raw.trim()) {
            Ok(url) => Some(url),
            Err(err) => {
                debug!(base_url = raw, %err, "ignoring unparsable base url");
                None
            }
        });
        Self { base }
    }

    /// Resolver honouring the document's own `<base href>`
    pub fn for_document<A: DomAdapter>(dom: &A, base_url: Option<&str>) -> Self {
        let resolver = Self::new(base_url);
        let Some(href) = dom
            .query(&dom.document(), "base[href]")
            .and_then(|base| dom.attr(&base, "href"))
        else {
            return resolver;
        };
        let joined = match &resolver.base {
            Some(base) => base.join(href.trim()).ok(),
            None => Url::parse(href.trim()).ok(),
        };
        match joined {
            Some(base) => Self { base: Some(base) },
            None => resolver,
        }
    }

    /// Absolute form of `href`; unchanged when already absolute or unresolvable
    pub fn resolve(&self, href: &str) -> String {
        let href = href.trim();
        if Url::parse(href).is_ok() {
            return href.to_string();
        }
        match &self.base {
            Some(base) => base
                .join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    /// True when a resolved URL points to another host than the base
    ///
    /// Without a base URL every absolute http(s) URL counts as external.
    pub fn is_external(&self, resolved: &str) -> bool {
        let Ok(url) = Url::parse(resolved) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return !matches!(url.scheme(), "mailto" | "tel");
        }
        match &self.base {
            Some(base) => base.host_str() != url.host_str(),
            None => true,
        }
    }
}

pub struct MetadataExtractor {
    resolver: UrlResolver,
}

impl MetadataExtractor {
    pub fn new(resolver: UrlResolver) -> Self {
        Self { resolver }
    }

    /// Extract metadata from the whole (uncleaned) document
    pub fn extract<A: DomAdapter>(&self, dom: &A) -> PageMetadata {
        let document = dom.document();
        let mut metadata = PageMetadata::default();
        let mut meta_title = None;
        let mut og_title = None;
        let mut twitter_title = None;

        for meta in dom.query_all(&document, "meta") {
            let Some(content) = dom.attr(&meta, "content").map(|c| c.trim().to_string()) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }
            let key = dom
                .attr(&meta, "property")
                .or_else(|| dom.attr(&meta, "name"))
                .or_else(|| dom.attr(&meta, "itemprop"))
                .map(|key| key.trim().to_ascii_lowercase());
            let Some(key) = key else {
                continue;
            };

            if key.starts_with("og:") {
                metadata
                    .og_tags
                    .entry(key.clone())
                    .or_insert_with(|| content.clone());
            }

            match key.as_str() {
                "title" => set_once(&mut meta_title, content),
                "og:title" => set_once(&mut og_title, content),
                "twitter:title" => set_once(&mut twitter_title, content),
                "description" | "og:description" | "twitter:description" => {
                    set_once(&mut metadata.description, content)
                }
                "author" | "article:author" | "byl" | "dc.creator" => {
                    set_once(&mut metadata.author, content)
                }
                "article:published_time" | "date" | "pubdate" | "publish-date"
                | "datepublished" | "dc.date" => set_once(&mut metadata.published, content),
                "og:site_name" | "application-name" => set_once(&mut metadata.site_name, content),
                "keywords" | "news_keywords" => {
                    for keyword in content.split(',') {
                        push_tag(&mut metadata.tags, keyword);
                    }
                }
                "article:tag" => push_tag(&mut metadata.tags, &content),
                _ => {}
            }
        }

        if metadata.author.is_none() {
            metadata.author = self.find_byline(dom);
        }
        if metadata.published.is_none() {
            metadata.published = dom
                .query(&document, "time[datetime]")
                .and_then(|time| dom.attr(&time, "datetime"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }

        metadata.canonical_url = dom
            .query(&document, "link[rel~=canonical][href]")
            .and_then(|link| dom.attr(&link, "href"))
            .map(|href| self.resolver.resolve(&href));

        let heading = first_text(dom, &document, "h1");
        let document_title = first_text(dom, &document, "title");
        metadata.title = [heading, meta_title, og_title, twitter_title, document_title]
            .into_iter()
            .flatten()
            .find(|title| !title.is_empty());

        metadata
    }

    fn find_byline<A: DomAdapter>(&self, dom: &A) -> Option<String> {
        let document = dom.document();
        ["[rel~=author]", "[itemprop=author]", ".byline", ".author"]
            .iter()
            .filter_map(|selector| first_text(dom, &document, selector))
            .find(|text| !text.is_empty() && text.chars().count() <= MAX_BYLINE_CHARS)
            .map(|text| {
                text.strip_prefix("By ")
                    .or_else(|| text.strip_prefix("by "))
                    .unwrap_or(&text)
                    .to_string()
            })
    }
}

/// Normalized text of the first match of `selector` under `root`
pub(crate) fn first_text<A: DomAdapter>(dom: &A, root: &A::Node, selector: &str) -> Option<String> {
    dom.query(root, selector)
        .map(|node| normalize_whitespace(&dom.text_of(&node)))
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn push_tag(tags: &mut Vec<String>, raw: &str) {
    let tag = raw.trim();
    if !tag.is_empty() && !tags.iter().any(|existing| existing.eq_ignore_ascii_case(tag)) {
        tags.push(tag.to_string());
    }
}
