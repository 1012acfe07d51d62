//! Recursive-descent parser: token stream to FACET AST.
//!
//! A document is zero or more facets. Each facet is `@name`, an optional
//! `&label`, an optional parenthesized attribute list, a newline, and an
//! optional body introduced by one `Indent` and closed by the matching
//! `Dedent`. The first content line of a body decides its shape: a dash
//! starts a list block, `key:` starts a mapping block, and the two never
//! mix.

use crate::ast::tokens::{Token, TokenKind};
use crate::ast::{
    AttrValue, Body, Document, Facet, LensArg, LensCall, ListBlock, ListItem, MappingBlock,
    MappingPair, MergeStrategy, Pipeline, Value, ValueKind,
};
use crate::diagnostics::{Diagnostic, ErrorCode};

/// Parse a token stream into a document.
pub fn parse(tokens: Vec<Token>) -> Result<Document, Diagnostic> {
    if tokens.is_empty() {
        return Ok(Document::default());
    }
    Parser::new(tokens).parse_document()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_document(&mut self) -> Result<Document, Diagnostic> {
        let mut facets = Vec::new();
        loop {
            self.skip_newlines();
            match &self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::At => facets.push(self.parse_facet()?),
                _ => {
                    return Err(self.error_here("expected '@' at the start of a facet"));
                }
            }
        }
        Ok(Document { facets })
    }

    fn parse_facet(&mut self) -> Result<Facet, Diagnostic> {
        let at = self.advance().clone();
        let name = self.expect_ident("facet name")?;

        let mut anchor = None;
        if matches!(self.peek().kind, TokenKind::Amp) {
            self.advance();
            anchor = Some(self.expect_ident("anchor label")?);
        }

        let mut attrs: Vec<(String, AttrValue)> = Vec::new();
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            self.parse_attr_list(&mut attrs)?;
        }

        // `@import "path"` shorthand: the bare string is the path attribute.
        if name == "import" {
            if let TokenKind::Str { value, triple } = &self.peek().kind {
                if *triple {
                    return Err(self.error_here("import paths use plain quoted strings"));
                }
                let path = value.clone();
                self.advance();
                upsert_attr(&mut attrs, "path", AttrValue::Str(path));
            }
        }

        self.expect_newline()?;

        let body = if matches!(self.peek().kind, TokenKind::Indent) {
            self.advance();
            self.parse_block()?
        } else {
            Body::Empty
        };

        Ok(Facet {
            name,
            anchor,
            attrs,
            body,
            strategy: MergeStrategy::Merge,
            line: at.line,
            column: at.column,
        })
    }

    /// Parse `key = literal (, key = literal)*` up to the closing paren.
    fn parse_attr_list(&mut self, attrs: &mut Vec<(String, AttrValue)>) -> Result<(), Diagnostic> {
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.advance();
            return Ok(());
        }
        loop {
            let key = self.expect_ident("attribute name")?;
            if !matches!(self.peek().kind, TokenKind::Equal) {
                return Err(self.error_here("expected '=' after attribute name"));
            }
            self.advance();
            let value = self.parse_attr_literal(&key)?;
            upsert_attr(attrs, &key, value);

            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    return Err(self.error_here("expected ',' or ')' in attribute list"));
                }
            }
        }
    }

    fn parse_attr_literal(&mut self, key: &str) -> Result<AttrValue, Diagnostic> {
        let token = self.peek().clone();
        let value = match &token.kind {
            TokenKind::Str { value, triple } => {
                if *triple {
                    return Err(Diagnostic::new(
                        ErrorCode::F301,
                        "attribute values use plain quoted strings",
                        token.line,
                        token.column,
                    ));
                }
                if value.contains('$') || value.contains("{{") {
                    return Err(Diagnostic::new(
                        ErrorCode::F304,
                        "substitution and interpolation are forbidden in attributes",
                        token.line,
                        token.column,
                    ));
                }
                AttrValue::Str(value.clone())
            }
            TokenKind::Number { value } => AttrValue::Number(*value),
            TokenKind::Bool { value } => AttrValue::Bool(*value),
            TokenKind::Null => AttrValue::Null,
            TokenKind::Ident { name } => {
                if key == "if" {
                    return Err(Diagnostic::new(
                        ErrorCode::F704,
                        "conditional expressions must be quoted: if=\"…\"",
                        token.line,
                        token.column,
                    ));
                }
                AttrValue::Ident(name.clone())
            }
            TokenKind::VarRef { .. } => {
                return Err(Diagnostic::new(
                    ErrorCode::F304,
                    "variable references are forbidden in attributes",
                    token.line,
                    token.column,
                ));
            }
            _ => {
                let code = if key == "if" {
                    ErrorCode::F704
                } else {
                    ErrorCode::F301
                };
                return Err(Diagnostic::new(
                    code,
                    format!("{} is not a valid attribute literal", token.describe()),
                    token.line,
                    token.column,
                ));
            }
        };
        if key == "if" && !matches!(value, AttrValue::Str(_)) {
            return Err(Diagnostic::new(
                ErrorCode::F704,
                "conditional expressions must be quoted: if=\"…\"",
                token.line,
                token.column,
            ));
        }
        self.advance();
        Ok(value)
    }

    /// Parse a block after its `Indent`; consumes the matching `Dedent`.
    fn parse_block(&mut self) -> Result<Body, Diagnostic> {
        match &self.peek().kind {
            TokenKind::Dash => {
                let block = self.parse_list_block()?;
                Ok(Body::List(block))
            }
            TokenKind::Ident { .. } => {
                let block = self.parse_mapping_block()?;
                Ok(Body::Mapping(block))
            }
            _ => Err(Diagnostic::new(
                ErrorCode::F101,
                "a block is either mapping pairs or list items",
                self.peek().line,
                self.peek().column,
            )),
        }
    }

    fn parse_list_block(&mut self) -> Result<ListBlock, Diagnostic> {
        let mut items = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Dash => {
                    items.push(self.parse_list_item()?);
                }
                TokenKind::Dedent => {
                    self.advance();
                    return Ok(ListBlock { items });
                }
                TokenKind::Ident { .. } => {
                    return Err(Diagnostic::new(
                        ErrorCode::F101,
                        "mapping pair inside a list block",
                        self.peek().line,
                        self.peek().column,
                    ));
                }
                _ => {
                    return Err(self.error_here("expected a list item"));
                }
            }
        }
    }

    fn parse_list_item(&mut self) -> Result<ListItem, Diagnostic> {
        let dash = self.advance().clone();
        let value = self.parse_inline_value()?;

        // `if="…"` is the only attribute a list item may carry.
        let mut condition = None;
        if let TokenKind::Ident { name } = &self.peek().kind {
            let attr_name = name.clone();
            if matches!(self.peek_at(1).kind, TokenKind::Equal) {
                let attr_token = self.peek().clone();
                if attr_name != "if" {
                    return Err(Diagnostic::new(
                        ErrorCode::F305,
                        format!("list items accept only the 'if' attribute, not '{}'", attr_name),
                        attr_token.line,
                        attr_token.column,
                    ));
                }
                self.advance();
                self.advance();
                match &self.peek().kind {
                    TokenKind::Str { value, triple: false } => {
                        condition = Some(value.clone());
                        self.advance();
                    }
                    _ => {
                        return Err(Diagnostic::new(
                            ErrorCode::F704,
                            "conditional expressions must be quoted: if=\"…\"",
                            self.peek().line,
                            self.peek().column,
                        ));
                    }
                }
            }
        }

        let pipeline = self.parse_pipeline_opt()?;
        if pipeline.is_some() && matches!(value.kind, ValueKind::Alias(_)) {
            return Err(Diagnostic::new(
                ErrorCode::F101,
                "pipelines cannot be applied to aliases",
                value.line,
                value.column,
            ));
        }
        self.expect_newline()?;

        Ok(ListItem {
            value,
            condition,
            pipeline,
            line: dash.line,
            column: dash.column,
        })
    }

    fn parse_mapping_block(&mut self) -> Result<MappingBlock, Diagnostic> {
        let mut pairs = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Ident { .. } => {
                    pairs.push(self.parse_mapping_pair()?);
                }
                TokenKind::Dedent => {
                    self.advance();
                    return Ok(MappingBlock { pairs });
                }
                TokenKind::Dash => {
                    return Err(Diagnostic::new(
                        ErrorCode::F101,
                        "list item inside a mapping block",
                        self.peek().line,
                        self.peek().column,
                    ));
                }
                _ => {
                    return Err(self.error_here("expected a mapping key"));
                }
            }
        }
    }

    fn parse_mapping_pair(&mut self) -> Result<MappingPair, Diagnostic> {
        let key_token = self.peek().clone();
        let key = self.expect_ident("mapping key")?;

        // Optional anchor on the key itself: `style &s: "friendly"`.
        let mut key_anchor = None;
        if matches!(self.peek().kind, TokenKind::Amp) {
            self.advance();
            key_anchor = Some(self.expect_ident("anchor label")?);
        }

        if !matches!(self.peek().kind, TokenKind::Colon) {
            return Err(self.error_here("expected ':' after mapping key"));
        }
        self.advance();

        let (mut value, pipeline) = if matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
            self.parse_nested_value()?
        } else {
            let value = self.parse_inline_value()?;
            let pipeline = self.parse_pipeline_opt()?;
            self.expect_newline()?;
            (value, pipeline)
        };

        if pipeline.is_some() && matches!(value.kind, ValueKind::Alias(_)) {
            return Err(Diagnostic::new(
                ErrorCode::F101,
                "pipelines cannot be applied to aliases",
                value.line,
                value.column,
            ));
        }

        if let Some(label) = key_anchor {
            let (line, column) = (value.line, value.column);
            value = Value::new(
                ValueKind::AnchorDef {
                    label,
                    inner: Box::new(value),
                },
                line,
                column,
            );
        }

        Ok(MappingPair {
            key,
            value,
            pipeline,
            line: key_token.line,
            column: key_token.column,
        })
    }

    /// Parse the indented form of a pair value: a nested block or a fence.
    fn parse_nested_value(&mut self) -> Result<(Value, Option<Pipeline>), Diagnostic> {
        if !matches!(self.peek().kind, TokenKind::Indent) {
            return Err(Diagnostic::new(
                ErrorCode::F101,
                "mapping key has no value",
                self.peek().line,
                self.peek().column,
            ));
        }
        self.advance();

        if let TokenKind::Fence { lang, body } = &self.peek().kind {
            let token = self.peek().clone();
            let kind = ValueKind::Fence {
                lang: lang.clone(),
                body: body.clone(),
            };
            self.advance();
            let pipeline = self.parse_pipeline_opt()?;
            self.expect_newline()?;
            if !matches!(self.peek().kind, TokenKind::Dedent) {
                return Err(self.error_here("expected end of block after fence"));
            }
            self.advance();
            return Ok((Value::new(kind, token.line, token.column), pipeline));
        }

        let start = self.peek().clone();
        let body = self.parse_block()?;
        let kind = match body {
            Body::Mapping(block) => ValueKind::NestedMap(block),
            Body::List(block) => ValueKind::NestedList(block),
            Body::Empty => {
                return Err(Diagnostic::new(
                    ErrorCode::F101,
                    "mapping key has no value",
                    start.line,
                    start.column,
                ));
            }
        };
        Ok((Value::new(kind, start.line, start.column), None))
    }

    fn parse_inline_value(&mut self) -> Result<Value, Diagnostic> {
        let token = self.peek().clone();
        let kind = match &token.kind {
            TokenKind::Amp => {
                self.advance();
                let label = self.expect_ident("anchor label")?;
                let inner = self.parse_inline_value()?;
                return Ok(Value::new(
                    ValueKind::AnchorDef {
                        label,
                        inner: Box::new(inner),
                    },
                    token.line,
                    token.column,
                ));
            }
            TokenKind::Star => {
                self.advance();
                let label = self.expect_ident("alias label")?;
                return Ok(Value::new(ValueKind::Alias(label), token.line, token.column));
            }
            TokenKind::Str { value, triple } => ValueKind::Str {
                value: value.clone(),
                triple: *triple,
            },
            TokenKind::Number { value } => ValueKind::Number(*value),
            TokenKind::Bool { value } => ValueKind::Bool(*value),
            TokenKind::Null => ValueKind::Null,
            TokenKind::Ident { name } => ValueKind::Ident(name.clone()),
            TokenKind::VarRef { path } => ValueKind::VarRef(path.clone()),
            TokenKind::Ext { ext, text } => ValueKind::Ext {
                ext: *ext,
                text: text.clone(),
            },
            TokenKind::LBrace => {
                return self.parse_inline_map();
            }
            TokenKind::LBrack => {
                return self.parse_inline_list();
            }
            _ => {
                return Err(Diagnostic::new(
                    ErrorCode::F001,
                    format!("expected a value, found {}", token.describe()),
                    token.line,
                    token.column,
                ));
            }
        };
        self.advance();
        Ok(Value::new(kind, token.line, token.column))
    }

    fn parse_inline_map(&mut self) -> Result<Value, Diagnostic> {
        let open = self.advance().clone();
        let mut entries = Vec::new();
        if matches!(self.peek().kind, TokenKind::RBrace) {
            self.advance();
            return Ok(Value::new(
                ValueKind::InlineMap(entries),
                open.line,
                open.column,
            ));
        }
        loop {
            let key = match &self.peek().kind {
                TokenKind::Ident { name } => {
                    let key = name.clone();
                    self.advance();
                    key
                }
                TokenKind::Str { value, triple: false } => {
                    let key = value.clone();
                    self.advance();
                    key
                }
                _ => {
                    return Err(self.error_here("expected a key in inline map"));
                }
            };
            if !matches!(self.peek().kind, TokenKind::Colon) {
                return Err(self.error_here("expected ':' in inline map"));
            }
            self.advance();
            let value = self.parse_inline_value()?;
            self.reject_inline_pipe()?;
            entries.push((key, value));

            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                    if matches!(self.peek().kind, TokenKind::RBrace) {
                        return Err(self.error_here("trailing comma in inline map"));
                    }
                }
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(Value::new(
                        ValueKind::InlineMap(entries),
                        open.line,
                        open.column,
                    ));
                }
                TokenKind::Newline => {
                    return Err(Diagnostic::new(
                        ErrorCode::F001,
                        "inline maps cannot span multiple lines",
                        self.peek().line,
                        self.peek().column,
                    ));
                }
                _ => {
                    return Err(self.error_here("expected ',' or '}' in inline map"));
                }
            }
        }
    }

    fn parse_inline_list(&mut self) -> Result<Value, Diagnostic> {
        let open = self.advance().clone();
        let mut values = Vec::new();
        if matches!(self.peek().kind, TokenKind::RBrack) {
            self.advance();
            return Ok(Value::new(
                ValueKind::InlineList(values),
                open.line,
                open.column,
            ));
        }
        loop {
            let value = self.parse_inline_value()?;
            self.reject_inline_pipe()?;
            values.push(value);
            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                    if matches!(self.peek().kind, TokenKind::RBrack) {
                        return Err(self.error_here("trailing comma in inline list"));
                    }
                }
                TokenKind::RBrack => {
                    self.advance();
                    return Ok(Value::new(
                        ValueKind::InlineList(values),
                        open.line,
                        open.column,
                    ));
                }
                TokenKind::Newline => {
                    return Err(Diagnostic::new(
                        ErrorCode::F001,
                        "inline lists cannot span multiple lines",
                        self.peek().line,
                        self.peek().column,
                    ));
                }
                _ => {
                    return Err(self.error_here("expected ',' or ']' in inline list"));
                }
            }
        }
    }

    /// Pipelines attach to whole values, never to inline sub-values.
    fn reject_inline_pipe(&mut self) -> Result<(), Diagnostic> {
        if matches!(self.peek().kind, TokenKind::Pipe) {
            return Err(Diagnostic::new(
                ErrorCode::F101,
                "pipelines are not allowed inside inline collections",
                self.peek().line,
                self.peek().column,
            ));
        }
        Ok(())
    }

    fn parse_pipeline_opt(&mut self) -> Result<Option<Pipeline>, Diagnostic> {
        if !matches!(self.peek().kind, TokenKind::Pipe) {
            return Ok(None);
        }
        let mut calls = Vec::new();
        while matches!(self.peek().kind, TokenKind::Pipe) {
            self.advance();
            let name_token = self.peek().clone();
            let name = self.expect_ident("lens name")?;
            let mut args = Vec::new();
            let mut kwargs = Vec::new();
            if matches!(self.peek().kind, TokenKind::LParen) {
                self.advance();
                self.parse_lens_args(&mut args, &mut kwargs)?;
            }
            calls.push(LensCall {
                name,
                args,
                kwargs,
                line: name_token.line,
                column: name_token.column,
            });
        }
        Ok(Some(Pipeline { calls }))
    }

    fn parse_lens_args(
        &mut self,
        args: &mut Vec<LensArg>,
        kwargs: &mut Vec<(String, LensArg)>,
    ) -> Result<(), Diagnostic> {
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.advance();
            return Ok(());
        }
        loop {
            match self.peek().kind.clone() {
                TokenKind::Ident { name } => {
                    if matches!(self.peek_at(1).kind, TokenKind::Equal) {
                        self.advance();
                        self.advance();
                        let value = self.parse_lens_literal()?;
                        kwargs.push((name, value));
                    } else {
                        return Err(Diagnostic::new(
                            ErrorCode::F801,
                            "lens arguments must be literals",
                            self.peek().line,
                            self.peek().column,
                        ));
                    }
                }
                _ => {
                    let value = self.parse_lens_literal()?;
                    args.push(value);
                }
            }
            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    return Err(self.error_here("expected ',' or ')' in lens arguments"));
                }
            }
        }
    }

    fn parse_lens_literal(&mut self) -> Result<LensArg, Diagnostic> {
        let token = self.peek().clone();
        let value = match &token.kind {
            TokenKind::Str { value, triple: false } => LensArg::Str(value.clone()),
            TokenKind::Number { value } => LensArg::Number(*value),
            TokenKind::Bool { value } => LensArg::Bool(*value),
            TokenKind::Null => LensArg::Null,
            _ => {
                return Err(Diagnostic::new(
                    ErrorCode::F801,
                    format!("lens arguments must be literals, found {}", token.describe()),
                    token.line,
                    token.column,
                ));
            }
        };
        self.advance();
        Ok(value)
    }

    // Cursor helpers.

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, Diagnostic> {
        match self.peek().kind.clone() {
            TokenKind::Ident { name } => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(&format!("expected {}", what))),
        }
    }

    fn expect_newline(&mut self) -> Result<(), Diagnostic> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error_here("expected end of line")),
        }
    }

    fn error_here(&self, message: &str) -> Diagnostic {
        let token = self.peek();
        Diagnostic::new(
            ErrorCode::F001,
            format!("{}, found {}", message, token.describe()),
            token.line,
            token.column,
        )
    }
}

fn upsert_attr(attrs: &mut Vec<(String, AttrValue)>, key: &str, value: AttrValue) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value,
        None => attrs.push((key.to_string(), value)),
    }
}
