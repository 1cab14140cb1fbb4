//! The read-only query gatekeeper.
//!
//! Given arbitrary SQL text, decide whether it may be executed and, if so,
//! produce the exact text to execute. The gate is a conservative policy
//! filter, not a SQL parser: a mutating statement must never pass (false
//! negatives are unacceptable), while rejecting some genuinely safe queries
//! is an accepted cost.

use regex::Regex;
use sqlward_core::QueryVerdict;
use std::sync::LazyLock;

/// Hard ceiling on the number of rows a query may return. The caller's
/// requested cap is a suggestion; this value is enforced here.
pub const MAX_ROW_CAP: u32 = 1000;

/// Keywords that reject a query on literal presence anywhere in the text.
///
/// This is intentionally a blunt substring filter. It produces false
/// positives (a string literal containing "update" inside a SELECT is
/// rejected); changing it to a tokenizer is a policy upgrade, not a bug fix.
pub const DENIED_KEYWORDS: [&str; 15] = [
    "insert",
    "update",
    "delete",
    "drop",
    "create",
    "alter",
    "truncate",
    "merge",
    "exec",
    "execute",
    "sp_",
    "xp_",
    "bulk",
    "openrowset",
    "opendatasource",
];

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--[^\r\n]*").expect("line comment pattern is valid")
});

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    // Non-nesting, non-greedy.
    Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid")
});

/// Approves or rejects raw query text before execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyGatekeeper;

impl ReadOnlyGatekeeper {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a query. Pure and synchronous: no I/O, deterministic given
    /// its two inputs.
    ///
    /// `max_rows` is clamped to `1..=MAX_ROW_CAP` before use.
    pub fn evaluate(&self, query_text: &str, max_rows: u32) -> QueryVerdict {
        let row_cap = max_rows.clamp(1, MAX_ROW_CAP);
        let lowered = query_text.to_lowercase();
        let contains_comments = query_text.contains("--") || query_text.contains("/*");

        if let Some(keyword) = DENIED_KEYWORDS.iter().find(|kw| lowered.contains(*kw)) {
            let reason = format!("query contains denylisted keyword '{}'", keyword);
            tracing::info!(keyword, "rejected query");
            return Self::rejection(query_text, reason, contains_comments);
        }

        // The comment-stripped scratch copy is used only to find the leading
        // keyword; the original text (comments intact) is what executes.
        let stripped = strip_comments(query_text);
        let leading = stripped
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if leading != "select" && leading != "with" {
            let reason = format!(
                "statement must begin with SELECT or WITH, found '{}'",
                leading
            );
            tracing::info!(leading = %leading, "rejected query");
            return Self::rejection(query_text, reason, contains_comments);
        }

        if contains_comments {
            tracing::debug!("approved query text contains comments");
        }

        let rewritten_text =
            apply_row_limit(query_text, &lowered, row_cap).unwrap_or_else(|| query_text.to_string());

        QueryVerdict {
            allowed: true,
            rewritten_text,
            reason: None,
            contains_comments,
        }
    }

    fn rejection(query_text: &str, reason: String, contains_comments: bool) -> QueryVerdict {
        QueryVerdict {
            allowed: false,
            rewritten_text: query_text.to_string(),
            reason: Some(reason),
            contains_comments,
        }
    }
}

/// Remove single-line and block comments for inspection. Comments are
/// replaced with a space so that removal never fuses two tokens.
fn strip_comments(text: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(text, " ");
    LINE_COMMENT.replace_all(&without_blocks, " ").into_owned()
}

/// Insert `TOP {cap}` after the first `SELECT` keyword, preserving the case
/// of the surrounding text. Returns `None` when no rewrite applies: the text
/// already carries a limiting clause, or it does not begin with `select `
/// (CTE-prefixed queries are deliberately left unbounded).
fn apply_row_limit(text: &str, lowered: &str, row_cap: u32) -> Option<String> {
    if lowered.contains("top ") || lowered.contains("top(") {
        return None;
    }
    if !lowered.trim_start().starts_with("select ") {
        return None;
    }
    let start = find_ascii_ci(text, "select")?;
    let end = start + "select".len();
    Some(format!("{} TOP {}{}", &text[..end], row_cap, &text[end..]))
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
