//! Deterministic JSON emission.
//!
//! Output is UTF-8 with insertion-ordered object keys. Numbers render in
//! canonical decimal form: integers without a decimal point, floats in their
//! shortest round-trippable representation (delegated to `serde_json`'s
//! number formatting). NaN and infinities cannot reach this module; the
//! literal grammar and lens contracts exclude them earlier.
//!
//! The one knob `serde_json` does not expose per call is ASCII-only output,
//! so the writer here escapes code points outside printable ASCII with
//! `\uXXXX` when asked to.

use serde_json::Value;

/// Emission options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    /// Pretty-print with two-space indentation.
    pub pretty: bool,
    /// Escape all non-ASCII code points as `\uXXXX`.
    pub ascii: bool,
}

/// Compact emission with UTF-8 literals.
pub fn to_string(value: &Value) -> String {
    emit(value, &EmitOptions::default())
}

/// Pretty emission with two-space indentation.
pub fn to_string_pretty(value: &Value) -> String {
    emit(
        value,
        &EmitOptions {
            pretty: true,
            ascii: false,
        },
    )
}

/// Emit with explicit options.
pub fn emit(value: &Value, options: &EmitOptions) -> String {
    let mut out = String::new();
    write_value(&mut out, value, options, 0);
    out
}

fn write_value(out: &mut String, value: &Value, options: &EmitOptions, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s, options),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline_indent(out, options, depth + 1);
                write_value(out, item, options, depth + 1);
            }
            newline_indent(out, options, depth);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline_indent(out, options, depth + 1);
                write_string(out, key, options);
                out.push(':');
                if options.pretty {
                    out.push(' ');
                }
                write_value(out, item, options, depth + 1);
            }
            newline_indent(out, options, depth);
            out.push('}');
        }
    }
}

fn newline_indent(out: &mut String, options: &EmitOptions, depth: usize) {
    if options.pretty {
        out.push('\n');
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
}

fn write_string(out: &mut String, s: &str, options: &EmitOptions) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if options.ascii && (c as u32) > 0x7e => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
