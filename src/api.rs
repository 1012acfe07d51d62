//! Host surface for the FACET compile engine.
//!
//! Pure functions over structured input; no I/O, no process exits, no
//! global state. Hosts that need file reading, exit codes, or colored
//! output build those on top (see the `facet` binary).

use serde_json::Value as Json;

use crate::anchors;
use crate::ast::Document;
use crate::diagnostics::Diagnostic;
use crate::imports;
use crate::lexer;
use crate::pipeline;

pub use crate::pipeline::CanonizeOptions;
pub use crate::vars::ResolveMode;

/// Canonicalize a source document to one JSON value.
///
/// Given identical source, host variables, resolve mode, and import-root
/// contents, two calls produce byte-identical output.
pub fn canonize(source: &[u8], options: &CanonizeOptions) -> Result<Json, Vec<Diagnostic>> {
    pipeline::canonicalize(source, options)
}

/// Lex, parse, and structurally check a document without touching imports
/// or variables.
///
/// An empty result means the document is structurally sound. Anchor checks
/// here run on the unpruned tree, so a document that lints clean can still
/// fail `canonize` when an alias crosses a conditional boundary.
pub fn lint(source: &[u8]) -> Vec<Diagnostic> {
    let document = match pipeline::parse_source(source) {
        Ok(document) => document,
        Err(diag) => return vec![diag],
    };
    // Fold local duplicate facet names the way canonicalization will, so
    // the anchor check sees the same per-facet scopes.
    let facets = match imports::collapse(document.facets, false) {
        Ok(facets) => facets,
        Err(diag) => return vec![diag],
    };
    match anchors::resolve(Document { facets }) {
        Ok(_) => Vec::new(),
        Err(diagnostics) => diagnostics,
    }
}

/// Normalize source for output: decode, strip a BOM, normalize newlines,
/// and ensure a trailing newline. The document must lint clean first.
///
/// String and fence bodies are never reflowed, so this is normalization,
/// not pretty-printing.
pub fn format_source(source: &[u8]) -> Result<String, Vec<Diagnostic>> {
    let text = lexer::normalize(source).map_err(|d| vec![d])?;
    let diagnostics = lint(text.as_bytes());
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    let mut out = text;
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
