//! Lexical query heuristics.
//!
//! These recommendations come purely from inspecting the query text, never
//! from the execution plan, so they stay available even when the engine
//! cannot produce one.

use regex::Regex;
use std::sync::LazyLock;

static SELECT_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)select\s+\*").expect("pattern is valid"));

static WHERE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwhere\b").expect("pattern is valid"));

static ORDER_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\border\s+by\b").expect("pattern is valid"));

static LEADING_WILDCARD_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blike\s+N?'%").expect("pattern is valid"));

/// Produce a short list of textual recommendations for a query.
pub fn recommendations(query_text: &str) -> Vec<String> {
    let lowered = query_text.to_lowercase();
    let mut out = Vec::new();

    if SELECT_STAR.is_match(query_text) {
        out.push(
            "SELECT * returns every column; name the columns you need to reduce I/O".to_string(),
        );
    }

    if !WHERE_CLAUSE.is_match(query_text) {
        out.push("no WHERE clause found; the query scans the entire table".to_string());
    }

    if ORDER_BY.is_match(query_text) && !lowered.contains("top ") && !lowered.contains("top(") {
        out.push(
            "ORDER BY without TOP sorts the full result set before returning it".to_string(),
        );
    }

    if LEADING_WILDCARD_LIKE.is_match(query_text) {
        out.push("LIKE with a leading wildcard cannot use an index seek".to_string());
    }

    out
}
