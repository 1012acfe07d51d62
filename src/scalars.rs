//! Extended scalar literals: timestamps, durations, sizes, and regexes.
//!
//! These forms are recognized in value position only. Each one is validated
//! at lex time and carried as text; canonicalization serializes the original
//! textual form as a JSON string. The `@` sigil of a timestamp and the
//! slashes of a regex are delimiters: the timestamp text is the bare
//! ISO-8601 string, while the regex keeps its `/pattern/flags` form so the
//! flags survive.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;

use crate::ast::tokens::ExtKind;

fn timestamp_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{1,9})?(Z|[+-]\d{2}:\d{2})?$")
            .expect("timestamp shape pattern is valid")
    })
}

/// Check a timestamp body (without the `@` sigil) against ISO-8601 shape and
/// calendar validity.
pub fn is_timestamp(text: &str) -> bool {
    if !timestamp_shape().is_match(text) {
        return false;
    }
    if text.ends_with('Z') || text[10..].contains('+') || text[10..].contains('-') {
        DateTime::parse_from_rfc3339(text).is_ok()
    } else {
        // Naive form: the shape check has already vetted the optional
        // fraction, so calendar validity is all that is left.
        let base = text.split('.').next().unwrap_or(text);
        NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S").is_ok()
    }
}

/// Map a numeric unit suffix to its extended-scalar kind.
pub fn classify_unit(unit: &str) -> Option<ExtKind> {
    match unit {
        "ms" | "s" | "m" | "h" | "d" => Some(ExtKind::Duration),
        "B" | "KB" | "MB" | "GB" => Some(ExtKind::Size),
        _ => None,
    }
}

/// Check that a string is a `.`-separated chain of identifiers.
pub fn is_dot_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
                _ => return false,
            }
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Split a `/pattern/flags` literal into its pattern (with `\/` unescaped)
/// and flags. The input is assumed to be lexically well formed.
pub fn split_regex_literal(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix('/')?;
    let mut pattern = String::new();
    let mut chars = body.chars();
    let mut closed = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                match chars.next() {
                    Some('/') => pattern.push('/'),
                    Some(other) => {
                        pattern.push('\\');
                        pattern.push(other);
                    }
                    None => return None,
                }
            }
            '/' => {
                closed = true;
                break;
            }
            c => pattern.push(c),
        }
    }
    if !closed {
        return None;
    }
    let flags: String = chars.collect();
    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((pattern, flags))
}

/// Validate a regex literal: the pattern must compile and the flags must be
/// ASCII letters.
pub fn is_valid_regex_literal(text: &str) -> bool {
    match split_regex_literal(text) {
        Some((pattern, _)) => Regex::new(&pattern).is_ok(),
        None => false,
    }
}

/// The canonical JSON string form of an extended scalar.
pub fn to_output_string(_kind: ExtKind, text: &str) -> String {
    text.to_string()
}
