//! Structured diagnostics for the compile engine.
//!
//! Errors are values, not out-of-band signals. Every failure the engine can
//! produce is a [`Diagnostic`] carrying a stable [`ErrorCode`] from the fixed
//! taxonomy, a human-readable message, and a 1-based source position. The
//! codes are part of the external contract and never change meaning.

use serde::Serialize;

/// The fixed diagnostic taxonomy.
///
/// Grouped by subsystem: lexical (F0xx), value/type (F1xx), anchors (F2xx),
/// attributes (F3xx), variables (F4xx), imports (F6xx), conditionals (F7xx),
/// lenses (F8xx), internal (F999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// General lexical error.
    F001,
    /// Indentation error or tab character.
    F002,
    /// Unterminated string or fence.
    F003,
    /// Value type error.
    F101,
    /// Lens input type mismatch.
    F102,
    /// Undefined alias or anchor cycle.
    F201,
    /// Anchor redefinition.
    F202,
    /// Attribute shape error.
    F301,
    /// Interpolation or substitution inside an attribute.
    F304,
    /// Disallowed list-item attribute.
    F305,
    /// Invalid embedded variable-type schema.
    F401,
    /// Missing interpolation path.
    F402A,
    /// Missing substitution path.
    F404,
    /// Variable type violation.
    F451,
    /// Variable constraint violation.
    F452,
    /// Invalid import path or directive.
    F601,
    /// Import cycle, or depth/count ceiling exceeded.
    F602,
    /// Strict-merge shape mismatch.
    F605,
    /// Comparison on mixed types.
    F703,
    /// Unquoted conditional expression.
    F704,
    /// Parse error in a conditional expression.
    F705,
    /// Lens argument error.
    F801,
    /// Unknown lens.
    F802,
    /// Regex compile failure.
    F803,
    /// Missing required seed argument.
    F804,
    /// Pipeline length exceeded.
    F805,
    /// Internal engine error.
    F999,
}

impl ErrorCode {
    /// Stable wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::F001 => "F001",
            ErrorCode::F002 => "F002",
            ErrorCode::F003 => "F003",
            ErrorCode::F101 => "F101",
            ErrorCode::F102 => "F102",
            ErrorCode::F201 => "F201",
            ErrorCode::F202 => "F202",
            ErrorCode::F301 => "F301",
            ErrorCode::F304 => "F304",
            ErrorCode::F305 => "F305",
            ErrorCode::F401 => "F401",
            ErrorCode::F402A => "F402A",
            ErrorCode::F404 => "F404",
            ErrorCode::F451 => "F451",
            ErrorCode::F452 => "F452",
            ErrorCode::F601 => "F601",
            ErrorCode::F602 => "F602",
            ErrorCode::F605 => "F605",
            ErrorCode::F703 => "F703",
            ErrorCode::F704 => "F704",
            ErrorCode::F705 => "F705",
            ErrorCode::F801 => "F801",
            ErrorCode::F802 => "F802",
            ErrorCode::F803 => "F803",
            ErrorCode::F804 => "F804",
            ErrorCode::F805 => "F805",
            ErrorCode::F999 => "F999",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One diagnostic record: `{code, message, line, column, hint?}` on the wire.
///
/// Line and column are 1-based and refer to the newline-normalized source.
/// A line or column of 0 means the position is unknown (e.g. a failure that
/// concerns the document as a whole).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            code,
            message: message.into(),
            line,
            column,
            hint: None,
        }
    }

    /// Attach a short remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render a caret snippet for this diagnostic against the normalized
    /// source: the offending line followed by a caret under the column.
    ///
    /// Returns `None` when the position is unknown or out of range.
    pub fn render_snippet(&self, source: &str) -> Option<String> {
        if self.line == 0 {
            return None;
        }
        let line_text = source.lines().nth(self.line - 1)?;
        let caret_at = self.column.saturating_sub(1).min(line_text.chars().count());
        let mut out = String::new();
        out.push_str(line_text);
        out.push('\n');
        for _ in 0..caret_at {
            out.push(' ');
        }
        out.push('^');
        out.push_str(&format!(" column {}", self.column));
        Some(out)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "{}: {} (line {}, column {})",
                self.code, self.message, self.line, self.column
            )
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Append-only diagnostic buffer carried through a canonicalization call.
///
/// Stages that can report several related problems (attribute validation,
/// variable typing) push into the buffer and let the caller decide when the
/// accumulated set is fatal.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: Vec<Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_wire_form() {
        assert_eq!(ErrorCode::F001.as_str(), "F001");
        assert_eq!(ErrorCode::F402A.as_str(), "F402A");
        assert_eq!(ErrorCode::F999.as_str(), "F999");
    }

    #[test]
    fn test_display_with_position() {
        let diag = Diagnostic::new(ErrorCode::F002, "tab in indentation", 3, 1);
        assert_eq!(
            diag.to_string(),
            "F002: tab in indentation (line 3, column 1)"
        );
    }

    #[test]
    fn test_snippet_caret_position() {
        let source = "@user\n  message: \"hi\"\n";
        let diag = Diagnostic::new(ErrorCode::F001, "example", 2, 3);
        let snippet = diag.render_snippet(source).unwrap();
        let mut lines = snippet.lines();
        assert_eq!(lines.next().unwrap(), "  message: \"hi\"");
        assert_eq!(lines.next().unwrap(), "  ^ column 3");
    }

    #[test]
    fn test_snippet_unknown_position() {
        let diag = Diagnostic::new(ErrorCode::F999, "internal", 0, 0);
        assert!(diag.render_snippet("anything").is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let diag = Diagnostic::new(ErrorCode::F404, "missing path", 1, 5).with_hint("define it");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "F404");
        assert_eq!(json["line"], 1);
        assert_eq!(json["hint"], "define it");
    }
}
