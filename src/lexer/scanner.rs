//! Character-level scanning of normalized FACET source.
//!
//! The scanner walks the input line by line. Blank and comment-only lines
//! vanish entirely; every content line contributes its indentation tokens,
//! its value tokens, and exactly one trailing `Newline`. Fences and
//! triple-quoted strings consume their full multi-line extent inside a
//! single token.

use crate::ast::tokens::{ExtKind, NumberLit, Token, TokenKind};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::lexer::indentation::IndentTracker;
use crate::limits;
use crate::scalars;

pub struct Scanner {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    indent: IndentTracker,
}

impl Scanner {
    pub fn new(text: &str) -> Self {
        Self {
            input: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            indent: IndentTracker::new(),
        }
    }

    /// Tokenize the whole input.
    pub fn scan(mut self) -> Result<Vec<Token>, Diagnostic> {
        while !self.is_at_end() {
            self.scan_line()?;
        }
        let line = self.line;
        for kind in self.indent.finalize() {
            self.tokens.push(Token::new(kind, line, 1));
        }
        self.tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
        Ok(self.tokens)
    }

    fn scan_line(&mut self) -> Result<(), Diagnostic> {
        // Leading indentation. Tabs are rejected outright.
        let mut width = 0usize;
        loop {
            match self.peek() {
                Some(' ') => {
                    width += 1;
                    self.advance();
                }
                Some('\t') => {
                    return Err(Diagnostic::new(
                        ErrorCode::F002,
                        "tab character in indentation; FACET indents with 2 spaces",
                        self.line,
                        self.column,
                    ));
                }
                _ => break,
            }
        }

        // Blank and comment-only lines do not affect indentation.
        match self.peek() {
            None => return Ok(()),
            Some('\n') => {
                self.advance();
                return Ok(());
            }
            Some('#') => {
                self.skip_to_line_end();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                return Ok(());
            }
            _ => {}
        }

        let changes = self.indent.transition(width, self.line)?;
        let (line, _) = (self.line, self.column);
        for kind in changes {
            self.tokens.push(Token::new(kind, line, 1));
        }

        self.scan_line_content(width)?;
        Ok(())
    }

    /// Scan tokens on one content line until (and including) its newline.
    fn scan_line_content(&mut self, indent_width: usize) -> Result<(), Diagnostic> {
        let mut line_has_content = false;
        loop {
            let Some(ch) = self.peek() else {
                // EOF without a trailing newline: close the line anyway.
                self.tokens
                    .push(Token::new(TokenKind::Newline, self.line, self.column));
                return Ok(());
            };
            match ch {
                '\n' => {
                    self.tokens
                        .push(Token::new(TokenKind::Newline, self.line, self.column));
                    self.advance();
                    return Ok(());
                }
                ' ' => {
                    self.advance();
                }
                '\t' => {
                    return Err(Diagnostic::new(
                        ErrorCode::F002,
                        "tab character outside a string or fence",
                        self.line,
                        self.column,
                    ));
                }
                '#' => {
                    self.skip_to_line_end();
                }
                '"' => {
                    let token = self.read_string()?;
                    self.tokens.push(token);
                    line_has_content = true;
                }
                '`' => {
                    if !line_has_content && self.lookahead_is("```") {
                        let token = self.read_fence(indent_width)?;
                        self.tokens.push(token);
                        line_has_content = true;
                        // The rest of the closing line (an optional pipeline)
                        // keeps scanning in this loop.
                    } else {
                        return Err(Diagnostic::new(
                            ErrorCode::F001,
                            "backtick outside a fence opener",
                            self.line,
                            self.column,
                        ));
                    }
                }
                '@' => {
                    if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        let token = self.read_timestamp()?;
                        self.tokens.push(token);
                    } else {
                        self.push_simple(TokenKind::At);
                    }
                    line_has_content = true;
                }
                '$' => {
                    let token = self.read_var_ref()?;
                    self.tokens.push(token);
                    line_has_content = true;
                }
                '/' => {
                    let token = self.read_regex()?;
                    self.tokens.push(token);
                    line_has_content = true;
                }
                '-' => {
                    if !line_has_content {
                        self.push_simple(TokenKind::Dash);
                    } else if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        let token = self.read_number()?;
                        self.tokens.push(token);
                    } else {
                        return Err(Diagnostic::new(
                            ErrorCode::F001,
                            "unexpected '-'",
                            self.line,
                            self.column,
                        ));
                    }
                    line_has_content = true;
                }
                '|' => {
                    if self.peek_at(1) == Some('>') {
                        let (line, column) = (self.line, self.column);
                        self.advance();
                        self.advance();
                        self.tokens.push(Token::new(TokenKind::Pipe, line, column));
                    } else {
                        return Err(Diagnostic::new(
                            ErrorCode::F001,
                            "lone '|'; the pipeline operator is '|>'",
                            self.line,
                            self.column,
                        ));
                    }
                    line_has_content = true;
                }
                '{' => {
                    self.push_simple(TokenKind::LBrace);
                    line_has_content = true;
                }
                '}' => {
                    self.push_simple(TokenKind::RBrace);
                    line_has_content = true;
                }
                '[' => {
                    self.push_simple(TokenKind::LBrack);
                    line_has_content = true;
                }
                ']' => {
                    self.push_simple(TokenKind::RBrack);
                    line_has_content = true;
                }
                '(' => {
                    self.push_simple(TokenKind::LParen);
                    line_has_content = true;
                }
                ')' => {
                    self.push_simple(TokenKind::RParen);
                    line_has_content = true;
                }
                ',' => {
                    self.push_simple(TokenKind::Comma);
                    line_has_content = true;
                }
                ':' => {
                    self.push_simple(TokenKind::Colon);
                    line_has_content = true;
                }
                '&' => {
                    self.push_simple(TokenKind::Amp);
                    line_has_content = true;
                }
                '*' => {
                    self.push_simple(TokenKind::Star);
                    line_has_content = true;
                }
                '=' => {
                    self.push_simple(TokenKind::Equal);
                    line_has_content = true;
                }
                c if c.is_ascii_digit() => {
                    let token = self.read_number()?;
                    self.tokens.push(token);
                    line_has_content = true;
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let token = self.read_ident();
                    self.tokens.push(token);
                    line_has_content = true;
                }
                c => {
                    return Err(Diagnostic::new(
                        ErrorCode::F001,
                        format!("unexpected character '{}'", c),
                        self.line,
                        self.column,
                    ));
                }
            }
        }
    }

    // Token readers.

    fn read_ident(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match name.as_str() {
            "true" => TokenKind::Bool { value: true },
            "false" => TokenKind::Bool { value: false },
            "null" => TokenKind::Null,
            _ => TokenKind::Ident { name },
        };
        Token::new(kind, line, column)
    }

    fn read_number(&mut self) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.advance();
        }

        let int_start = text.len();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let int_digits = &text[int_start..];
        if int_digits.is_empty() {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                "malformed number",
                line,
                column,
            ));
        }
        if int_digits.len() > 1 && int_digits.starts_with('0') {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                "leading zero is permitted only for the literal 0",
                line,
                column,
            ));
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                ahead = 2;
            }
            if self.peek_at(ahead).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                for _ in 0..ahead {
                    text.push(self.peek().unwrap());
                    self.advance();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        // A unit suffix turns a plain integer into a duration or size.
        if !is_float && self.peek().map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
            let mut unit = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphabetic() {
                    unit.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let literal = format!("{}{}", text, unit);
            let ext = scalars::classify_unit(&unit).ok_or_else(|| {
                Diagnostic::new(
                    ErrorCode::F001,
                    format!("unknown unit '{}' after number", unit),
                    line,
                    column,
                )
            })?;
            if text.starts_with('-') {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    "durations and sizes take unsigned digits",
                    line,
                    column,
                ));
            }
            return Ok(Token::new(TokenKind::Ext { ext, text: literal }, line, column));
        }

        let value = if is_float {
            let parsed: f64 = text.parse().map_err(|_| {
                Diagnostic::new(ErrorCode::F001, "malformed number", line, column)
            })?;
            if !parsed.is_finite() {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    "number is out of range",
                    line,
                    column,
                ));
            }
            NumberLit::Float(parsed)
        } else {
            match text.parse::<i64>() {
                Ok(i) => NumberLit::Int(i),
                Err(_) => {
                    return Err(Diagnostic::new(
                        ErrorCode::F001,
                        "integer is out of range",
                        line,
                        column,
                    ))
                }
            }
        };
        Ok(Token::new(TokenKind::Number { value }, line, column))
    }

    fn read_string(&mut self) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote
        if self.peek() == Some('"') && self.peek_at(1) == Some('"') {
            self.advance();
            self.advance();
            return self.read_triple_string_body(line, column);
        }
        if self.peek() == Some('"') {
            // Empty string.
            self.advance();
            return Ok(Token::new(
                TokenKind::Str {
                    value: String::new(),
                    triple: false,
                },
                line,
                column,
            ));
        }

        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Diagnostic::new(
                        ErrorCode::F003,
                        "unterminated string",
                        line,
                        column,
                    ));
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::Str { value, triple: false },
                        line,
                        column,
                    ));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.peek().ok_or_else(|| {
                        Diagnostic::new(ErrorCode::F003, "unterminated string", line, column)
                    })?;
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        '/' => value.push('/'),
                        'u' => {
                            self.advance();
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(
                                    || {
                                        Diagnostic::new(
                                            ErrorCode::F001,
                                            "\\u escape requires four hex digits",
                                            self.line,
                                            self.column,
                                        )
                                    },
                                )?;
                                code = code * 16 + digit;
                                self.advance();
                            }
                            let c = char::from_u32(code).ok_or_else(|| {
                                Diagnostic::new(
                                    ErrorCode::F001,
                                    "\\u escape is not a valid scalar value",
                                    self.line,
                                    self.column,
                                )
                            })?;
                            value.push(c);
                            continue;
                        }
                        other => {
                            return Err(Diagnostic::new(
                                ErrorCode::F001,
                                format!("unknown escape '\\{}'", other),
                                self.line,
                                self.column,
                            ));
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_triple_string_body(&mut self, line: usize, column: usize) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(Diagnostic::new(
                    ErrorCode::F003,
                    "unterminated triple-quoted string",
                    line,
                    column,
                ));
            }
            if self.lookahead_is("\"\"\"") {
                self.advance();
                self.advance();
                self.advance();
                return Ok(Token::new(
                    TokenKind::Str { value, triple: true },
                    line,
                    column,
                ));
            }
            value.push(self.peek().unwrap());
            self.advance();
        }
    }

    fn read_fence(&mut self, indent_width: usize) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        self.advance();

        // Optional language tag, then end of the opening line.
        let mut lang = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+' {
                lang.push(c);
                self.advance();
            } else {
                break;
            }
        }
        while self.peek() == Some(' ') {
            self.advance();
        }
        match self.peek() {
            Some('\n') => {
                self.advance();
            }
            None => {
                return Err(Diagnostic::new(
                    ErrorCode::F003,
                    "unterminated fence",
                    line,
                    column,
                ));
            }
            Some(c) => {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    format!("unexpected '{}' after fence opener", c),
                    self.line,
                    self.column,
                ));
            }
        }

        let mut body = String::new();
        let mut captured_any = false;
        loop {
            if self.is_at_end() {
                return Err(Diagnostic::new(
                    ErrorCode::F003,
                    "unterminated fence",
                    line,
                    column,
                ));
            }

            // Peek the line's leading spaces without consuming past them.
            let mut leading = 0usize;
            while self.peek_at(leading) == Some(' ') {
                leading += 1;
            }
            let at_closer = leading == indent_width
                && self.peek_at(leading) == Some('`')
                && self.peek_at(leading + 1) == Some('`')
                && self.peek_at(leading + 2) == Some('`');
            if at_closer {
                for _ in 0..indent_width + 3 {
                    self.advance();
                }
                let body = if captured_any { body } else { String::new() };
                let lang = if lang.is_empty() { None } else { Some(lang) };
                return Ok(Token::new(TokenKind::Fence { lang, body }, line, column));
            }

            // Capture one body line, stripping the opener's indentation.
            let mut stripped = 0usize;
            while stripped < indent_width && self.peek() == Some(' ') {
                self.advance();
                stripped += 1;
            }
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                body.push(c);
                self.advance();
            }
            if self.peek() == Some('\n') {
                self.advance();
            }
            body.push('\n');
            captured_any = true;
            if body.len() > limits::MAX_FENCE_BYTES {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    format!(
                        "fence body exceeds the maximum of {} bytes",
                        limits::MAX_FENCE_BYTES
                    ),
                    line,
                    column,
                ));
            }
        }
    }

    fn read_timestamp(&mut self) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.advance(); // '@'
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | ':' | 'T' | '.' | 'Z' | '+') {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if !scalars::is_timestamp(&text) {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                format!("'@{}' is not an ISO-8601 timestamp", text),
                line,
                column,
            ));
        }
        Ok(Token::new(
            TokenKind::Ext {
                ext: ExtKind::Timestamp,
                text,
            },
            line,
            column,
        ))
    }

    fn read_var_ref(&mut self) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.advance(); // '$'
        if self.peek() == Some('{') {
            self.advance();
            let mut path = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                    path.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if self.peek() != Some('}') {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    "unterminated '${' variable reference",
                    line,
                    column,
                ));
            }
            self.advance();
            if path.is_empty() || !scalars::is_dot_path(&path) {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    "malformed variable path",
                    line,
                    column,
                ));
            }
            return Ok(Token::new(TokenKind::VarRef { path }, line, column));
        }

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() || name.chars().next().unwrap().is_ascii_digit() {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                "malformed variable reference after '$'",
                line,
                column,
            ));
        }
        Ok(Token::new(TokenKind::VarRef { path: name }, line, column))
    }

    fn read_regex(&mut self) -> Result<Token, Diagnostic> {
        let (line, column) = (self.line, self.column);
        let mut text = String::from("/");
        self.advance(); // opening slash
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Diagnostic::new(
                        ErrorCode::F001,
                        "unterminated regex literal",
                        line,
                        column,
                    ));
                }
                Some('\\') => {
                    text.push('\\');
                    self.advance();
                    if let Some(c) = self.peek() {
                        if c != '\n' {
                            text.push(c);
                            self.advance();
                        }
                    }
                }
                Some('/') => {
                    text.push('/');
                    self.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if !scalars::is_valid_regex_literal(&text) {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                format!("'{}' is not a valid regex literal", text),
                line,
                column,
            ));
        }
        Ok(Token::new(
            TokenKind::Ext {
                ext: ExtKind::Regex,
                text,
            },
            line,
            column,
        ))
    }

    // Cursor helpers.

    fn push_simple(&mut self, kind: TokenKind) {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.tokens.push(Token::new(kind, line, column));
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn lookahead_is(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}
