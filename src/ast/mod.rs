//! The shared FACET abstract syntax tree.
//!
//! The lexer and parser produce immutable trees of these nodes; every later
//! pipeline stage returns a revised tree and leaves its input intact. The
//! representation is an owned tagged union, never a shared graph, so anchors
//! can be reused but never made cyclic.

pub mod tokens;

pub use tokens::{ExtKind, NumberLit, Token, TokenKind};

/// A whole source document: an ordered list of facets. Import directives
/// appear as facets with the reserved name `import` until expansion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub facets: Vec<Facet>,
}

/// How a facet introduced by an import merges over an earlier facet of the
/// same name. Locally defined facets always merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    #[default]
    Merge,
    Replace,
}

/// A top-level named block.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub name: String,
    /// Optional `&label` on the facet line itself.
    pub anchor: Option<String>,
    /// Insertion-ordered attribute list.
    pub attrs: Vec<(String, AttrValue)>,
    pub body: Body,
    /// Merge behavior stamped by the import expander.
    pub strategy: MergeStrategy,
    pub line: usize,
    pub column: usize,
}

impl Facet {
    /// Look up an attribute value by key.
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A facet body. Mapping pairs and list items never coexist in one block.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Mapping(MappingBlock),
    List(ListBlock),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingBlock {
    pub pairs: Vec<MappingPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingPair {
    pub key: String,
    pub value: Value,
    pub pipeline: Option<Pipeline>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListBlock {
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub value: Value,
    /// Raw text of the item's `if="…"` attribute, the only one admitted.
    pub condition: Option<String>,
    pub pipeline: Option<Pipeline>,
    pub line: usize,
    pub column: usize,
}

/// Attribute literals. The grammar bars every form of substitution and
/// interpolation here, so the payloads are plain.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Number(NumberLit),
    Bool(bool),
    Null,
    Ident(String),
}

impl AttrValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Str(s) => serde_json::Value::String(s.clone()),
            AttrValue::Number(n) => serde_json::Value::Number(n.to_json()),
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Ident(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// A value with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub line: usize,
    pub column: usize,
}

impl Value {
    pub fn new(kind: ValueKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

/// The tagged union of value forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Str {
        value: String,
        /// Triple-quoted bodies also take `{{…}}` interpolation.
        triple: bool,
    },
    Number(NumberLit),
    Bool(bool),
    Null,
    /// Bare identifier in value position; canonicalizes to a string.
    Ident(String),
    /// `$name` or `${a.b}` awaiting scalar substitution.
    VarRef(String),
    InlineMap(Vec<(String, Value)>),
    InlineList(Vec<Value>),
    NestedMap(MappingBlock),
    NestedList(ListBlock),
    Fence {
        lang: Option<String>,
        body: String,
    },
    AnchorDef {
        label: String,
        inner: Box<Value>,
    },
    Alias(String),
    Ext {
        ext: ExtKind,
        text: String,
    },
    /// A value already resolved to JSON by substitution or a lens pipeline.
    Resolved(serde_json::Value),
}

/// A chain of lens calls applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub calls: Vec<LensCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LensCall {
    pub name: String,
    pub args: Vec<LensArg>,
    pub kwargs: Vec<(String, LensArg)>,
    pub line: usize,
    pub column: usize,
}

/// Lens argument literals. `VarRef` appears only in pipelines parsed out of
/// `{{ … }}` interpolations; the document grammar requires literals.
#[derive(Debug, Clone, PartialEq)]
pub enum LensArg {
    Str(String),
    Number(NumberLit),
    Bool(bool),
    Null,
    VarRef(String),
}
