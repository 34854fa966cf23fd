//! Code block language resolution
//!
//! The language of a `<pre>` block is resolved in three steps, first hit wins:
//!
//! 1. An explicit hint on the code element or the `<pre>` itself
//!    (`class="language-rust"`, `lang-js`, `data-lang`, `data-language`)
//! 2. A hint on an ancestor container (`highlight-source-python`,
//!    `language-go highlighter-rouge`, `data-lang`)
//! 3. Content signatures: keyword and symbol patterns of common languages
//!
//! The heuristic only answers when one language clearly scores; otherwise the
//! fence stays untagged.

use regex::Regex;
use std::sync::OnceLock;

use crate::dom::DomAdapter;

/// Minimum heuristic score for a language to be reported
const MIN_SIGNATURE_SCORE: u32 = 2;

/// Ancestors inspected for a language hint
const MAX_HINT_ANCESTORS: usize = 4;

const CLASS_PREFIXES: &[&str] = &[
    "language-",
    "lang-",
    "highlight-source-",
    "highlight-",
    "brush:",
    "sourceCode-",
];

const HINT_ATTRIBUTES: &[&str] = &["data-lang", "data-language"];

/// Class values that carry a prefix but are not languages
const NON_LANGUAGE_HINTS: &[&str] = &["none", "plaintext", "text", "txt", "source", "nohighlight"];

/// (language, pattern, weight) signatures for the content heuristic
const SIGNATURES: &[(&str, &str, u32)] = &[
    ("python", r"(?m)^\s*def \w+\s*\(.*\)\s*(->\s*[\w\[\], .]+)?:\s*$", 3),
    ("python", r"(?m)^\s*(from [\w.]+ )?import [\w., ]+$", 1),
    ("python", r"(?m)^\s*class \w+(\(.*\))?:\s*$", 2),
    ("python", r"\bprint\(|\bself\.\w+|\belif\b|__name__", 1),
    ("rust", r"\bfn \w+(<[^>]*>)?\s*\(", 2),
    ("rust", r"\blet mut \w+|\bimpl(<[^>]*>)? \w+|\buse \w+(::\w+)+", 2),
    ("rust", r"\bpub (fn|struct|enum|mod)\b|println!\(|&mut \w+", 1),
    ("go", r"(?m)^package \w+\s*$", 3),
    ("go", r"\bfunc (\(\w+ \*?\w+\) )?\w+\(", 2),
    ("go", r"\w+ := |\bfmt\.\w+\(", 1),
    ("java", r"\bpublic (static )?(class|void|interface)\b", 2),
    ("java", r"System\.out\.println|@Override", 2),
    ("cpp", r"(?m)^#include\s*[<\x22]", 3),
    ("cpp", r"\bstd::\w+|\bint main\s*\(", 1),
    ("typescript", r"\binterface \w+ \{|:\s*(string|number|boolean)\b", 2),
    ("javascript", r"\bfunction\s*\w*\s*\(|console\.log\(", 2),
    ("javascript", r"\b(const|let|var) \w+ = |=> \{?", 1),
    ("bash", r"(?m)^#!/(usr/)?bin/(env )?(ba|z)?sh", 3),
    ("bash", r"(?m)^\s*\$ \w+|(?m)^\s*(sudo|apt-get|brew|npm|pip|cargo|git|cd|export) ", 2),
    ("sql", r"(?i)\bSELECT\b[\s\S]+\bFROM\b|\bINSERT INTO\b|\bCREATE TABLE\b", 3),
    ("html", r"(?i)<!DOCTYPE html|<(div|span|html|body|head)[\s>]", 3),
    ("css", r"(?m)^\s*[.#]?[\w-]+(\s*[.#:>][\w-]+)*\s*\{\s*$|^\s*[\w-]+:\s*[^;]+;\s*$", 2),
    ("json", r#"^\s*[\{\[]\s*"[\w-]+"\s*:"#, 3),
    ("yaml", r"(?m)^[\w-]+:\s+\S+\s*$(\n[\w-]+:\s+\S+\s*$)+", 2),
];

/// Resolve the language of a code block rooted at `pre`
pub fn resolve_language<A: DomAdapter>(dom: &A, pre: &A::Node, code: &str) -> Option<String> {
    explicit_hint(dom, pre)
        .or_else(|| ancestor_hint(dom, pre))
        .or_else(|| detect_from_content(code))
}

/// Hint on the `<code>` child or on the `<pre>` element itself
fn explicit_hint<A: DomAdapter>(dom: &A, pre: &A::Node) -> Option<String> {
    let code_children = dom
        .children(pre)
        .into_iter()
        .filter(|child| dom.tag_name(child).as_deref() == Some("code"));
    code_children
        .chain(std::iter::once(pre.clone()))
        .find_map(|node| hint_of(dom, &node))
}

fn ancestor_hint<A: DomAdapter>(dom: &A, pre: &A::Node) -> Option<String> {
    let mut current = dom.parent(pre);
    for _ in 0..MAX_HINT_ANCESTORS {
        let node = current?;
        if let Some(language) = hint_of(dom, &node) {
            return Some(language);
        }
        current = dom.parent(&node);
    }
    None
}

fn hint_of<A: DomAdapter>(dom: &A, node: &A::Node) -> Option<String> {
    for class in dom.classes(node) {
        for prefix in CLASS_PREFIXES {
            if let Some(language) = class.strip_prefix(prefix)
                && let Some(language) = normalize_language(language)
            {
                return Some(language);
            }
        }
    }
    HINT_ATTRIBUTES
        .iter()
        .filter_map(|attr| dom.attr(node, attr))
        .find_map(|value| normalize_language(&value))
}

/// Lowercase a language hint and map common aliases
pub fn normalize_language(raw: &str) -> Option<String> {
    let language = raw.trim().to_ascii_lowercase();
    if language.is_empty()
        || NON_LANGUAGE_HINTS.contains(&language.as_str())
        || !language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'))
    {
        return None;
    }
    let canonical = match language.as_str() {
        "js" | "jsx" | "node" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "py3" | "python3" => "python",
        "rs" => "rust",
        "sh" | "shell" | "zsh" | "console" | "shell-session" => "bash",
        "c++" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" | "c#" => "csharp",
        "yml" => "yaml",
        "golang" => "go",
        "rb" => "ruby",
        "md" => "markdown",
        "htm" | "xhtml" => "html",
        other => other,
    };
    Some(canonical.to_string())
}

fn compiled_signatures() -> &'static [(&'static str, Regex, u32)] {
    static COMPILED: OnceLock<Vec<(&'static str, Regex, u32)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SIGNATURES
            .iter()
            .filter_map(|(language, pattern, weight)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| (*language, regex, *weight))
            })
            .collect()
    })
}

/// Guess a language from the code text alone
///
/// Returns `None` unless the best-scoring language reaches the minimum score
/// and beats every other candidate.
pub fn detect_from_content(code: &str) -> Option<String> {
    if code.trim().is_empty() {
        return None;
    }
    let mut scores: Vec<(&str, u32)> = Vec::new();
    for (language, regex, weight) in compiled_signatures() {
        if regex.is_match(code) {
            match scores.iter_mut().find(|(name, _)| name == language) {
                Some((_, score)) => *score += weight,
                None => scores.push((*language, *weight)),
            }
        }
    }

    let (best, best_score) = scores.iter().max_by_key(|(_, score)| *score).copied()?;
    let tied = scores
        .iter()
        .filter(|(_, score)| *score == best_score)
        .count();
    if best_score < MIN_SIGNATURE_SCORE || tied > 1 {
        return None;
    }
    Some(best.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlDocument;

    fn resolve(html: &str) -> Option<String> {
        let dom = HtmlDocument::parse(html).unwrap();
        let pre = dom.query(&dom.document(), "pre").expect("pre present");
        let code = dom.text_of(&pre);
        resolve_language(&dom, &pre, &code)
    }

    #[test]
    fn test_explicit_class_on_code() {
        assert_eq!(
            resolve(r#"<pre><code class="language-python">x = 1</code></pre>"#).as_deref(),
            Some("python")
        );
        assert_eq!(
            resolve(r#"<pre><code class="hljs lang-js">x</code></pre>"#).as_deref(),
            Some("javascript")
        );
    }

    #[test]
    fn test_explicit_attribute_on_pre() {
        assert_eq!(
            resolve(r#"<pre data-lang="Rust"><code>x</code></pre>"#).as_deref(),
            Some("rust")
        );
    }

    #[test]
    fn test_ancestor_hint() {
        assert_eq!(
            resolve(r#"<div class="highlight highlight-source-go"><pre>x</pre></div>"#).as_deref(),
            Some("go")
        );
        assert_eq!(
            resolve(r#"<div class="language-ruby highlighter-rouge"><div class="highlight"><pre>x</pre></div></div>"#)
                .as_deref(),
            Some("ruby")
        );
    }

    #[test]
    fn test_explicit_beats_heuristic() {
        assert_eq!(
            resolve(r#"<pre><code class="language-text">def foo():</code></pre>"#).as_deref(),
            Some("python"),
            "non-language hint is ignored and the heuristic answers"
        );
        assert_eq!(
            resolve(r#"<pre><code class="language-ruby">def foo():</code></pre>"#).as_deref(),
            Some("ruby")
        );
    }

    #[test]
    fn test_python_heuristic() {
        assert_eq!(detect_from_content("def foo():\n    return 1\n").as_deref(), Some("python"));
    }

    #[test]
    fn test_other_heuristics() {
        assert_eq!(
            detect_from_content("fn main() {\n    let mut x = 1;\n}").as_deref(),
            Some("rust")
        );
        assert_eq!(
            detect_from_content("package main\n\nfunc main() {\n}").as_deref(),
            Some("go")
        );
        assert_eq!(
            detect_from_content("SELECT id, name\nFROM users\nWHERE id = 1;").as_deref(),
            Some("sql")
        );
        assert_eq!(
            detect_from_content("#include <stdio.h>\nint main(void) { return 0; }").as_deref(),
            Some("cpp")
        );
        assert_eq!(detect_from_content("#!/bin/bash\necho hi").as_deref(), Some("bash"));
        assert_eq!(
            detect_from_content("{\n  \"name\": \"demo\",\n  \"version\": 1\n}").as_deref(),
            Some("json")
        );
    }

    #[test]
    fn test_unrecognizable_is_untagged() {
        assert_eq!(detect_from_content("hello world\nthis is just text"), None);
        assert_eq!(detect_from_content("   "), None);
        assert_eq!(resolve("<pre>lorem ipsum dolor</pre>"), None);
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("JS").as_deref(), Some("javascript"));
        assert_eq!(normalize_language("c++").as_deref(), Some("cpp"));
        assert_eq!(normalize_language("plaintext"), None);
        assert_eq!(normalize_language("a b"), None);
    }

    #[test]
    fn test_all_signatures_compile() {
        assert_eq!(compiled_signatures().len(), SIGNATURES.len());
    }
}
