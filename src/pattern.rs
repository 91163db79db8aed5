//! Glob pattern compilation
//!
//! Graphite-style query patterns use `*` for a single path segment, literal
//! dots as segment separators, and `{a,b,c}` for alternation. This module
//! translates a pattern into a regular expression, either fully anchored
//! (`^...$`) for leaf/branch matching, or prefix-anchored (`^...`) when the
//! expression is shipped to a backend that treats regexes as substring
//! matches.
//!
//! Compilation is pure: no caching, no side effects. A pattern that does not
//! translate into a parsable expression is rejected with
//! [`PatternError::InvalidPattern`]; it never degrades to a match-all.

use crate::error::PatternError;
use regex::Regex;

/// Anchoring mode for a compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `^...$` — exact-name matching for leaves and branches
    Full,
    /// `^...` — prefix filter shipped to the backing store, which may not
    /// support end-anchoring
    Prefix,
}

/// Translate a glob pattern into regex source text
///
/// Translation rules, applied per character:
/// `.` → `\.`, `*` → `[^.]*`, `{` → `(`, `,` → `|`, `}` → `)`.
/// Everything else passes through untouched.
pub fn to_regex_source(pattern: &str, anchor: Anchor) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '.' => out.push_str("\\."),
            '*' => out.push_str("[^.]*"),
            '{' => out.push('('),
            ',' => out.push('|'),
            '}' => out.push(')'),
            other => out.push(other),
        }
    }
    if anchor == Anchor::Full {
        out.push('$');
    }
    out
}

/// Compile a glob pattern into a [`Regex`]
///
/// # Arguments
///
/// * `pattern` - the glob pattern (`app.*.cpu.{user,system}`)
/// * `anchor` - full anchoring for name matching, prefix anchoring for
///   store-side filters
///
/// # Errors
///
/// Returns [`PatternError::InvalidPattern`] when the translated expression
/// does not parse, e.g. an unbalanced `{`.
pub fn compile(pattern: &str, anchor: Anchor) -> Result<Regex, PatternError> {
    let source = to_regex_source(pattern, anchor);
    Regex::new(&source).map_err(|e| PatternError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
