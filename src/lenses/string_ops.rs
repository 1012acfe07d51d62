//! String lenses.
//!
//! Every lens here is total over its declared input and argument types and
//! touches nothing outside them. The cleanup lenses (`trim`, `dedent`,
//! `squeeze_spaces`, `normalize_newlines`) are idempotent: applying one a
//! second time is a no-op.

use regex::Regex;
use serde_json::Value;

use crate::diagnostics::{Diagnostic, ErrorCode};

use super::ResolvedCall;

fn input_str(input: &Value) -> &str {
    input.as_str().expect("input kind checked by the runtime")
}

/// Strip ASCII whitespace from both ends.
pub(super) fn run_trim(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    let s = input_str(input);
    let trimmed = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    Ok(Value::String(trimmed.to_string()))
}

/// Remove the longest whitespace prefix common to all non-blank lines.
/// Whitespace-only lines are ignored for the computation and normalized to
/// empty, matching the usual dedent behavior.
pub(super) fn run_dedent(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    Ok(Value::String(dedent(input_str(input))))
}

pub(crate) fn dedent(s: &str) -> String {
    let mut common: Option<String> = None;
    for line in s.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        let prefix: String = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        common = Some(match common {
            None => prefix,
            Some(current) => current
                .chars()
                .zip(prefix.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    let common = common.unwrap_or_default();

    let lines: Vec<String> = s
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else if let Some(rest) = line.strip_prefix(&common) {
                rest.to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    lines.join("\n")
}

/// Collapse runs of ASCII spaces and tabs into a single space, preserving
/// newlines.
pub(super) fn run_squeeze_spaces(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    let s = input_str(input);
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    Ok(Value::String(out))
}

/// Truncate to at most `n` bytes without splitting a UTF-8 sequence.
pub(super) fn run_limit(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(1, &["n"])?;
    let n = match call.kwarg("n").or_else(|| call.args.first()) {
        Some(Value::Number(n)) => n
            .as_i64()
            .filter(|v| *v >= 0)
            .ok_or_else(|| call.arg_error("limit requires a non-negative integer"))?,
        Some(_) => return Err(call.arg_error("limit requires a non-negative integer")),
        None => return Err(call.arg_error("limit requires a byte count")),
    } as usize;
    let s = input_str(input);
    Ok(Value::String(truncate_to_boundary(s, n).to_string()))
}

pub(crate) fn truncate_to_boundary(s: &str, mut n: usize) -> &str {
    if n >= s.len() {
        return s;
    }
    while n > 0 && !s.is_char_boundary(n) {
        n -= 1;
    }
    &s[..n]
}

/// Replace `\r\n` and bare `\r` with `\n`.
pub(super) fn run_normalize_newlines(
    input: &Value,
    call: &ResolvedCall,
) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    let s = input_str(input);
    Ok(Value::String(s.replace("\r\n", "\n").replace('\r', "\n")))
}

pub(super) fn run_lower(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    Ok(Value::String(input_str(input).to_ascii_lowercase()))
}

pub(super) fn run_upper(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    Ok(Value::String(input_str(input).to_ascii_uppercase()))
}

/// Literal substitution, left to right, non-overlapping.
pub(super) fn run_replace(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(2, &[])?;
    let old = call.str_arg(0, "old")?.to_string();
    let new = call.str_arg(1, "new")?.to_string();
    if old.is_empty() {
        return Err(call.arg_error("replace requires a non-empty search string"));
    }
    Ok(Value::String(input_str(input).replace(&old, &new)))
}

/// Regex replacement with capture-group interpolation (`$1`, `$name`).
pub(super) fn run_regex_replace(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(2, &[])?;
    let pattern = call.str_arg(0, "pattern")?.to_string();
    let replacement = call.str_arg(1, "replacement")?.to_string();
    let re = Regex::new(&pattern).map_err(|e| {
        Diagnostic::new(
            ErrorCode::F803,
            format!("cannot compile regex '{}': {}", pattern, e),
            call.line,
            call.column,
        )
    })?;
    let out = re.replace_all(input_str(input), replacement.as_str());
    Ok(Value::String(out.into_owned()))
}

/// If the input parses as JSON, emit its minimal form; otherwise identity.
pub(super) fn run_json_minify(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    let s = input_str(input);
    match serde_json::from_str::<Value>(s) {
        Ok(parsed) => Ok(Value::String(
            serde_json::to_string(&parsed).expect("re-serializing parsed JSON cannot fail"),
        )),
        Err(_) => Ok(Value::String(s.to_string())),
    }
}

/// Best-effort removal of common Markdown delimiters.
pub(super) fn run_strip_markdown(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(0, &[])?;
    let s = input_str(input);
    // Links first so their brackets do not survive as emphasis fodder.
    let link = Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("static pattern");
    let heading = Regex::new(r"(?m)^#{1,6}[ \t]+").expect("static pattern");
    let emphasis = Regex::new(r"(\*\*|__|\*|_|`|~~)").expect("static pattern");
    let quoted = Regex::new(r"(?m)^>[ \t]?").expect("static pattern");

    let out = link.replace_all(s, "$1");
    let out = heading.replace_all(&out, "");
    let out = quoted.replace_all(&out, "");
    let out = emphasis.replace_all(&out, "");
    Ok(Value::String(out.into_owned()))
}
