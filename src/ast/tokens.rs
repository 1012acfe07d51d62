//! Token definitions shared by the lexer and the parser.

use serde::Serialize;

/// Numeric literal payload. Integers and floats are kept apart so that
/// canonical JSON emission can render integers without a decimal point.
///
/// NaN and infinities cannot be produced by the literal grammar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumberLit {
    Int(i64),
    Float(f64),
}

impl NumberLit {
    /// Convert to a `serde_json::Number`. Floats are guaranteed finite.
    pub fn to_json(self) -> serde_json::Number {
        match self {
            NumberLit::Int(i) => serde_json::Number::from(i),
            NumberLit::Float(f) => {
                serde_json::Number::from_f64(f).expect("literal floats are finite")
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            NumberLit::Int(i) => i as f64,
            NumberLit::Float(f) => f,
        }
    }
}

/// Kinds of extended scalar literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtKind {
    Timestamp,
    Duration,
    Size,
    Regex,
}

/// A lexical token with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenKind {
    /// `@` introducing a facet.
    At,
    Ident {
        name: String,
    },
    /// String literal. `triple` distinguishes `"""…"""` bodies, which keep
    /// newlines verbatim and admit no escapes.
    Str {
        value: String,
        triple: bool,
    },
    Number {
        value: NumberLit,
    },
    Bool {
        value: bool,
    },
    Null,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    LParen,
    RParen,
    Comma,
    Colon,
    /// `&` introducing an anchor label.
    Amp,
    /// `*` introducing an alias.
    Star,
    Equal,
    /// List-item marker at the start of a line.
    Dash,
    /// The `|>` bigram.
    Pipe,
    Newline,
    Indent,
    Dedent,
    /// A captured fence body with its optional language tag.
    Fence {
        lang: Option<String>,
        body: String,
    },
    /// `$name` or `${a.b}` variable reference.
    VarRef {
        path: String,
    },
    /// Extended scalar literal, kept as text.
    Ext {
        ext: ExtKind,
        text: String,
    },
    Eof,
}

/// A token with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(flatten)]
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    /// Short description used in parser error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::At => "'@'".to_string(),
            TokenKind::Ident { name } => format!("identifier '{}'", name),
            TokenKind::Str { .. } => "string".to_string(),
            TokenKind::Number { .. } => "number".to_string(),
            TokenKind::Bool { value } => format!("'{}'", value),
            TokenKind::Null => "'null'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBrack => "'['".to_string(),
            TokenKind::RBrack => "']'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Amp => "'&'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Equal => "'='".to_string(),
            TokenKind::Dash => "'-'".to_string(),
            TokenKind::Pipe => "'|>'".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Fence { .. } => "fence".to_string(),
            TokenKind::VarRef { path } => format!("variable reference '${}'", path),
            TokenKind::Ext { text, .. } => format!("extended scalar '{}'", text),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({:?}, {}:{})", self.kind, self.line, self.column)
    }
}
