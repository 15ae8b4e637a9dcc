//! Auto-correction of common DataPrime query mistakes.
//!
//! Rewrites applied outside quoted literals:
//!
//! - `AND` / `OR` become `&&` / `||`,
//! - a lone `=` comparison becomes `==`,
//! - empty pipeline stages and runs of whitespace are collapsed.
//!
//! Severity comparisons are normalized to the upper-case enum form
//! (`$m.severity == 'error'` becomes `$m.severity == ERROR`), a missing
//! `source logs` stage is prepended, and trailing pipes are dropped.
//! Lucene queries are only trimmed.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::models::QuerySyntax;

static SEVERITY_LITERAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\$m\.severity\s*(?:==|!=|>=|<=|>|<)\s*)['"]?([a-z]+)['"]?"#).ok()
});
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());
static AND_KEYWORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bAND\b").ok());
static OR_KEYWORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bOR\b").ok());
static SINGLE_EQUALS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s=\s").ok());
static EMPTY_STAGE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\|\s+\|").ok());

/// Corrected query text and the names of the rewrites that changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedQuery {
    pub text: String,
    pub changes: Vec<&'static str>,
}

impl CorrectedQuery {
    pub fn was_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

fn replace(re: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Apply `f` to every run of text outside single or double quotes.
/// Backslash escapes inside quotes are honored.
fn map_unquoted(query: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(query.len());
    let mut segment = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in query.chars() {
        match quote {
            Some(q) => {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '\'' || c == '"' => {
                out.push_str(&f(&segment));
                segment.clear();
                out.push(c);
                quote = Some(c);
            }
            None => segment.push(c),
        }
    }
    out.push_str(&f(&segment));
    out
}

/// Correct `query` for the given syntax.
pub fn correct_query(query: &str, syntax: QuerySyntax) -> CorrectedQuery {
    let mut changes = Vec::new();
    let original = query.trim();
    if syntax == QuerySyntax::Lucene {
        return CorrectedQuery {
            text: original.to_string(),
            changes,
        };
    }

    let mut text = original.to_string();

    if let Some(re) = SEVERITY_LITERAL.as_ref() {
        let next = re
            .replace_all(&text, |caps: &Captures| format!("{}{}", &caps[1], caps[2].to_uppercase()))
            .into_owned();
        if next != text {
            changes.push("severity_literal");
            text = next;
        }
    }

    let steps: [(&'static str, &LazyLock<Option<Regex>>, &str); 5] = [
        ("whitespace", &WHITESPACE, " "),
        ("and_keyword", &AND_KEYWORD, "&&"),
        ("or_keyword", &OR_KEYWORD, "||"),
        ("single_equals", &SINGLE_EQUALS, " == "),
        ("empty_stage", &EMPTY_STAGE, "|"),
    ];
    for (name, re, with) in steps {
        let next = map_unquoted(&text, |segment| replace(re, segment, with));
        if next != text {
            // Whitespace collapsing alone is cosmetic and not reported.
            if name != "whitespace" {
                changes.push(name);
            }
            text = next;
        }
    }

    let trimmed = text
        .trim()
        .trim_start_matches(|c: char| c == '|' || c.is_whitespace())
        .trim_end_matches(|c: char| c == '|' || c.is_whitespace());
    if trimmed.len() != text.trim().len() {
        changes.push("dangling_pipe");
    }
    let mut text = trimmed.to_string();

    if !text.starts_with("source ") {
        changes.push("source_prefix");
        text = if text.is_empty() {
            "source logs".to_string()
        } else {
            format!("source logs | {text}")
        };
    }

    CorrectedQuery { text, changes }
}
