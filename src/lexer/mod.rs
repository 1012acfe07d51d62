//! FACET lexer: lexical normalization and tokenization.
//!
//! Lexing is the first pipeline stage. It decodes UTF-8 (ignoring a leading
//! BOM), normalizes line endings to `\n`, and produces a stream of positioned
//! tokens with explicit `Indent`/`Dedent` structure. Trailing spaces on a
//! line are insignificant outside strings and fences, so they are skipped
//! during scanning rather than rewritten.

pub mod indentation;
pub mod scanner;

use crate::ast::tokens::Token;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::limits;
use scanner::Scanner;

/// Decode and normalize raw source bytes.
///
/// Enforces the document size ceiling, rejects invalid UTF-8, strips one
/// leading BOM, and rewrites `\r\n` and bare `\r` to `\n`.
pub fn normalize(source: &[u8]) -> Result<String, Diagnostic> {
    if source.len() > limits::MAX_DOCUMENT_BYTES {
        return Err(Diagnostic::new(
            ErrorCode::F001,
            format!(
                "document exceeds the maximum of {} bytes",
                limits::MAX_DOCUMENT_BYTES
            ),
            0,
            0,
        ));
    }
    let text = std::str::from_utf8(source)
        .map_err(|e| Diagnostic::new(ErrorCode::F001, format!("invalid UTF-8: {}", e), 0, 0))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Tokenize normalized source text.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Diagnostic> {
    Scanner::new(text).scan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::tokens::{ExtKind, NumberLit, TokenKind};

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_normalize_line_endings() {
        let text = normalize(b"a\r\nb\rc\n").unwrap();
        assert_eq!(text, "a\nb\nc\n");
    }

    #[test]
    fn test_normalize_strips_bom() {
        let text = normalize("\u{feff}@user\n".as_bytes()).unwrap();
        assert_eq!(text, "@user\n");
    }

    #[test]
    fn test_simple_facet_tokens() {
        let tokens = kinds("@user\n  message: \"hi\"\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::At,
                TokenKind::Ident {
                    name: "user".into()
                },
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident {
                    name: "message".into()
                },
                TokenKind::Colon,
                TokenKind::Str {
                    value: "hi".into(),
                    triple: false
                },
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tab_in_indentation_is_f002() {
        let err = tokenize("@a\n\tkey: 1\n").unwrap_err();
        assert_eq!(err.code, crate::diagnostics::ErrorCode::F002);
    }

    #[test]
    fn test_comment_lines_vanish() {
        let tokens = kinds("# top comment\n@a\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::At,
                TokenKind::Ident { name: "a".into() },
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_trailing_comment_discarded() {
        let tokens = kinds("@a  # says a\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::At,
                TokenKind::Ident { name: "a".into() },
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_pipe_bigram() {
        let tokens = kinds("@a\n  k: \"v\" |> trim\n");
        assert!(tokens.contains(&TokenKind::Pipe));
    }

    #[test]
    fn test_lone_pipe_rejected() {
        assert!(tokenize("@a\n  k: \"v\" | trim\n").is_err());
    }

    #[test]
    fn test_number_forms() {
        let tokens = kinds("@a\n  i: 42\n  f: 3.25\n  e: 1e3\n  n: -7\n");
        assert!(tokens.contains(&TokenKind::Number {
            value: NumberLit::Int(42)
        }));
        assert!(tokens.contains(&TokenKind::Number {
            value: NumberLit::Float(3.25)
        }));
        assert!(tokens.contains(&TokenKind::Number {
            value: NumberLit::Float(1000.0)
        }));
        assert!(tokens.contains(&TokenKind::Number {
            value: NumberLit::Int(-7)
        }));
    }

    #[test]
    fn test_leading_zero_rejected() {
        assert!(tokenize("@a\n  k: 042\n").is_err());
        assert!(tokenize("@a\n  k: 0\n").is_ok());
        assert!(tokenize("@a\n  k: 0.5\n").is_ok());
    }

    #[test]
    fn test_duration_and_size_literals() {
        let tokens = kinds("@a\n  t: 30s\n  s: 4KB\n");
        assert!(tokens.contains(&TokenKind::Ext {
            ext: ExtKind::Duration,
            text: "30s".into()
        }));
        assert!(tokens.contains(&TokenKind::Ext {
            ext: ExtKind::Size,
            text: "4KB".into()
        }));
    }

    #[test]
    fn test_timestamp_literal() {
        let tokens = kinds("@a\n  at: @2024-01-15T10:30:00Z\n");
        assert!(tokens.contains(&TokenKind::Ext {
            ext: ExtKind::Timestamp,
            text: "2024-01-15T10:30:00Z".into()
        }));
    }

    #[test]
    fn test_regex_literal() {
        let tokens = kinds("@a\n  r: /ab\\/c/i\n");
        assert!(tokens.contains(&TokenKind::Ext {
            ext: ExtKind::Regex,
            text: "/ab\\/c/i".into()
        }));
    }

    #[test]
    fn test_triple_string_keeps_newlines() {
        let tokens = kinds("@a\n  k: \"\"\"line1\nline2\"\"\"\n");
        assert!(tokens.contains(&TokenKind::Str {
            value: "line1\nline2".into(),
            triple: true
        }));
    }

    #[test]
    fn test_unterminated_string_is_f003() {
        let err = tokenize("@a\n  k: \"oops\n").unwrap_err();
        assert_eq!(err.code, crate::diagnostics::ErrorCode::F003);
    }

    #[test]
    fn test_fence_capture() {
        let src = "@a\n  code:\n    ```python\n    print(1)\n    ```\n";
        let tokens = kinds(src);
        assert!(tokens.contains(&TokenKind::Fence {
            lang: Some("python".into()),
            body: "print(1)\n".into()
        }));
    }

    #[test]
    fn test_unterminated_fence_is_f003() {
        let err = tokenize("@a\n  code:\n    ```\n    body\n").unwrap_err();
        assert_eq!(err.code, crate::diagnostics::ErrorCode::F003);
    }

    #[test]
    fn test_var_ref_tokens() {
        let tokens = kinds("@a\n  k: $seed\n  p: ${a.b}\n");
        assert!(tokens.contains(&TokenKind::VarRef {
            path: "seed".into()
        }));
        assert!(tokens.contains(&TokenKind::VarRef {
            path: "a.b".into()
        }));
    }

    #[test]
    fn test_blank_lines_do_not_dedent() {
        let src = "@a\n  k: 1\n\n  j: 2\n";
        let tokens = kinds(src);
        let dedents = tokens
            .iter()
            .filter(|k| matches!(k, TokenKind::Dedent))
            .count();
        assert_eq!(dedents, 1);
    }
}
