//! Indentation tracking and indent/dedent token generation.
//!
//! FACET indentation is exactly two spaces per level. The tracker keeps a
//! stack of indentation widths, initially `[0]`, and turns the width of each
//! content line into at most one `Indent` or a run of `Dedent`s. Any other
//! transition is an indentation error.

use crate::ast::tokens::TokenKind;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::limits;

/// Stack-based indentation tracker.
#[derive(Debug, Clone)]
pub struct IndentTracker {
    stack: Vec<usize>,
}

impl IndentTracker {
    pub fn new() -> Self {
        Self { stack: vec![0] }
    }

    /// Process the leading-space width of a content line and return the
    /// indentation tokens it implies.
    pub fn transition(&mut self, width: usize, line: usize) -> Result<Vec<TokenKind>, Diagnostic> {
        if width % 2 != 0 {
            return Err(Diagnostic::new(
                ErrorCode::F002,
                format!("indentation of {} spaces is not a multiple of 2", width),
                line,
                width + 1,
            ));
        }

        let top = *self.stack.last().expect("indent stack is never empty");

        if width > top {
            if width != top + 2 {
                return Err(Diagnostic::new(
                    ErrorCode::F002,
                    format!(
                        "indentation jumps from {} to {} spaces; blocks indent one level at a time",
                        top, width
                    ),
                    line,
                    width + 1,
                ));
            }
            if self.stack.len() >= limits::MAX_INDENT_DEPTH {
                return Err(Diagnostic::new(
                    ErrorCode::F002,
                    format!(
                        "indentation exceeds the maximum depth of {} levels",
                        limits::MAX_INDENT_DEPTH
                    ),
                    line,
                    width + 1,
                ));
            }
            self.stack.push(width);
            return Ok(vec![TokenKind::Indent]);
        }

        let mut tokens = Vec::new();
        while *self.stack.last().expect("indent stack is never empty") > width {
            self.stack.pop();
            tokens.push(TokenKind::Dedent);
        }
        if *self.stack.last().expect("indent stack is never empty") != width {
            return Err(Diagnostic::new(
                ErrorCode::F002,
                format!(
                    "indentation of {} spaces does not match any open block",
                    width
                ),
                line,
                width + 1,
            ));
        }
        Ok(tokens)
    }

    /// Emit the dedents needed to unwind back to the base level.
    pub fn finalize(&mut self) -> Vec<TokenKind> {
        let mut tokens = Vec::new();
        while self.stack.len() > 1 {
            self.stack.pop();
            tokens.push(TokenKind::Dedent);
        }
        tokens
    }

    /// Current indentation width in spaces.
    pub fn current_width(&self) -> usize {
        *self.stack.last().expect("indent stack is never empty")
    }
}

impl Default for IndentTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_indent_and_dedent() {
        let mut tracker = IndentTracker::new();
        assert_eq!(tracker.transition(2, 1).unwrap(), vec![TokenKind::Indent]);
        assert_eq!(
            tracker.transition(0, 2).unwrap(),
            vec![TokenKind::Dedent]
        );
    }

    #[test]
    fn test_multi_level_dedent() {
        let mut tracker = IndentTracker::new();
        tracker.transition(2, 1).unwrap();
        tracker.transition(4, 2).unwrap();
        let tokens = tracker.transition(0, 3).unwrap();
        assert_eq!(tokens, vec![TokenKind::Dedent, TokenKind::Dedent]);
    }

    #[test]
    fn test_odd_width_rejected() {
        let mut tracker = IndentTracker::new();
        let err = tracker.transition(3, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::F002);
    }

    #[test]
    fn test_two_level_jump_rejected() {
        let mut tracker = IndentTracker::new();
        let err = tracker.transition(4, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::F002);
    }

    #[test]
    fn test_dedent_to_unknown_width_rejected() {
        let mut tracker = IndentTracker::new();
        tracker.transition(2, 1).unwrap();
        tracker.transition(4, 2).unwrap();
        // 2 is on the stack, 6 never was; widths must match exactly.
        tracker.stack = vec![0, 4];
        let err = tracker.transition(2, 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::F002);
    }

    #[test]
    fn test_finalize_unwinds_everything() {
        let mut tracker = IndentTracker::new();
        tracker.transition(2, 1).unwrap();
        tracker.transition(4, 2).unwrap();
        assert_eq!(tracker.finalize().len(), 2);
        assert_eq!(tracker.current_width(), 0);
    }
}
