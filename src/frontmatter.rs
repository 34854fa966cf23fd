//! YAML front matter generation
//!
//! Produces the `---` delimited header placed before the Markdown body:
//!
//! ```yaml
//! ---
//! title: "Page Title"
//! url: "https://example.com/page"
//! captured: "2024-01-15T10:30:00Z"
//! author: "Author Name"
//! published: "2024-01-15"
//! description: "Page description"
//! tags: ["rust", "parsing"]
//! wordCount: 1234
//! readingTimeMinutes: 7
//! ---
//! ```
//!
//! `title`, `url` and `captured` are always present; a missing title or URL
//! is written as a placeholder. The remaining keys appear only when a value
//! is available. Every string is double-quoted with YAML escapes, so page
//! text can never break out of its value.

use chrono::{DateTime, SecondsFormat, Utc};

/// Title written when the page has none
pub const UNTITLED: &str = "Untitled";

/// URL written when the page location is unknown
pub const UNKNOWN_URL: &str = "unknown";

/// Values written to the front matter block
#[derive(Debug, Clone, Default)]
pub struct FrontmatterFields<'a> {
    pub title: Option<&'a str>,
    pub url: Option<&'a str>,
    /// Capture time; the current time when absent
    pub captured: Option<DateTime<Utc>>,
    pub author: Option<&'a str>,
    pub published: Option<&'a str>,
    pub description: Option<&'a str>,
    pub tags: &'a [String],
    pub word_count: Option<usize>,
    pub reading_time_minutes: Option<usize>,
}

#[derive(Debug, Default)]
pub struct FrontmatterGenerator;

impl FrontmatterGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the block, closing `---` line included
    pub fn generate(&self, fields: &FrontmatterFields<'_>) -> String {
        let mut output = String::with_capacity(256);
        output.push_str("---\n");

        write_field(&mut output, "title", non_empty(fields.title).unwrap_or(UNTITLED));
        write_field(&mut output, "url", non_empty(fields.url).unwrap_or(UNKNOWN_URL));
        let captured = fields.captured.unwrap_or_else(Utc::now);
        write_field(
            &mut output,
            "captured",
            &captured.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        if let Some(author) = non_empty(fields.author) {
            write_field(&mut output, "author", author);
        }
        if let Some(published) = non_empty(fields.published) {
            write_field(&mut output, "published", published);
        }
        if let Some(description) = non_empty(fields.description) {
            write_field(&mut output, "description", description);
        }

        let tags: Vec<&str> = fields
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect();
        if !tags.is_empty() {
            output.push_str("tags: [");
            for (index, tag) in tags.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                write_yaml_string(&mut output, tag);
            }
            output.push_str("]\n");
        }

        if let Some(word_count) = fields.word_count {
            output.push_str(&format!("wordCount: {word_count}\n"));
        }
        if let Some(minutes) = fields.reading_time_minutes {
            output.push_str(&format!("readingTimeMinutes: {minutes}\n"));
        }

        output.push_str("---\n");
        output
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn write_field(output: &mut String, key: &str, value: &str) {
    output.push_str(key);
    output.push_str(": ");
    write_yaml_string(output, value);
    output.push('\n');
}

/// Write a YAML double-quoted scalar
///
/// - `"` (double quote) -> `\"`
/// - `\` (backslash) -> `\\`
/// - newline, carriage return, tab -> `\n`, `\r`, `\t`
/// - other control characters -> `\uXXXX`
fn write_yaml_string(output: &mut String, value: &str) {
    output.push('"');
    for ch in value.chars() {
        match ch {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => output.push_str(&format!("\\u{:04X}", c as u32)),
            _ => output.push(ch),
        }
    }
    output.push('"');
}
