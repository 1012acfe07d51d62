//! Import expansion and facet merging.
//!
//! `@import "path"` splices another document's facets in place of the
//! directive. Paths must be relative, normalized, and rooted under one of
//! the configured import roots; anything else is rejected before the
//! filesystem is touched. Each canonicalization call carries its own cache
//! and resolution stack, so concurrent calls share nothing.
//!
//! Splicing and collapsing are separate steps. [`expand`] only splices;
//! the canonicalizer runs [`collapse`] later, after conditional pruning,
//! so a facet-level `if` governs exactly the occurrence it is written on.
//! Collapse folds duplicate facet names in load order: attributes merge
//! key-by-key (last wins), mapping bodies merge recursively, list bodies
//! concatenate, and a mapping/list shape conflict either replaces
//! (default) or errors (strict merge). A facet imported with
//! `strategy="replace"` supersedes any earlier definition wholesale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{AttrValue, Body, Document, Facet, MappingBlock, MergeStrategy, Value, ValueKind};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::lexer;
use crate::limits;
use crate::parser;

/// Expand all imports in a document, splicing imported facets in place of
/// each directive. Duplicate facet names are left as-is for [`collapse`].
pub fn expand(document: Document, import_roots: &[PathBuf]) -> Result<Document, Vec<Diagnostic>> {
    let mut ctx = ImportContext {
        roots: import_roots,
        cache: HashMap::new(),
        active: Vec::new(),
        loaded: 0,
    };
    let facets = expand_facets(document.facets, &mut ctx).map_err(|d| vec![d])?;
    Ok(Document { facets })
}

struct ImportContext<'a> {
    roots: &'a [PathBuf],
    cache: HashMap<PathBuf, Vec<Facet>>,
    active: Vec<PathBuf>,
    loaded: usize,
}

fn expand_facets(
    facets: Vec<Facet>,
    ctx: &mut ImportContext<'_>,
) -> Result<Vec<Facet>, Diagnostic> {
    let mut out = Vec::with_capacity(facets.len());
    for facet in facets {
        if facet.name == "import" {
            out.extend(expand_one_import(&facet, ctx)?);
        } else {
            out.push(facet);
        }
    }
    Ok(out)
}

fn expand_one_import(
    directive: &Facet,
    ctx: &mut ImportContext<'_>,
) -> Result<Vec<Facet>, Diagnostic> {
    let (line, column) = (directive.line, directive.column);

    let path = match directive.attr("path") {
        Some(AttrValue::Str(path)) => path.clone(),
        Some(_) => {
            return Err(Diagnostic::new(
                ErrorCode::F601,
                "import path must be a string",
                line,
                column,
            ));
        }
        None => {
            return Err(Diagnostic::new(
                ErrorCode::F601,
                "@import requires a path",
                line,
                column,
            ));
        }
    };
    let strategy = match directive.attr("strategy") {
        None => MergeStrategy::Merge,
        Some(AttrValue::Str(s)) if s == "merge" => MergeStrategy::Merge,
        Some(AttrValue::Str(s)) if s == "replace" => MergeStrategy::Replace,
        Some(_) => {
            return Err(Diagnostic::new(
                ErrorCode::F601,
                "import strategy must be \"merge\" or \"replace\"",
                line,
                column,
            ));
        }
    };

    check_path_shape(&path, line, column)?;
    let resolved = resolve_under_roots(&path, ctx.roots).ok_or_else(|| {
        Diagnostic::new(
            ErrorCode::F601,
            format!("'{}' was not found under any import root", path),
            line,
            column,
        )
    })?;

    if ctx.active.contains(&resolved) {
        return Err(Diagnostic::new(
            ErrorCode::F602,
            format!("import cycle through '{}'", path),
            line,
            column,
        ));
    }

    let facets = if let Some(cached) = ctx.cache.get(&resolved) {
        cached.clone()
    } else {
        if ctx.active.len() >= limits::MAX_IMPORT_DEPTH {
            return Err(Diagnostic::new(
                ErrorCode::F602,
                format!(
                    "imports nest deeper than the maximum of {}",
                    limits::MAX_IMPORT_DEPTH
                ),
                line,
                column,
            ));
        }
        ctx.loaded += 1;
        if ctx.loaded > limits::MAX_IMPORT_COUNT {
            return Err(Diagnostic::new(
                ErrorCode::F602,
                format!(
                    "more than {} files imported in one canonicalization",
                    limits::MAX_IMPORT_COUNT
                ),
                line,
                column,
            ));
        }

        let bytes = std::fs::read(&resolved).map_err(|e| {
            Diagnostic::new(
                ErrorCode::F601,
                format!("cannot read import '{}': {}", path, e),
                line,
                column,
            )
        })?;
        let tokens = lexer::normalize(&bytes)
            .and_then(|text| lexer::tokenize(&text))
            .map_err(|d| annotate_import_error(d, &path))?;
        let imported = parser::parse(tokens).map_err(|d| annotate_import_error(d, &path))?;

        ctx.active.push(resolved.clone());
        let result = expand_facets(imported.facets, ctx);
        ctx.active.pop();
        let facets = result?;
        ctx.cache.insert(resolved, facets.clone());
        facets
    };

    Ok(facets
        .into_iter()
        .map(|mut facet| {
            facet.strategy = strategy;
            facet
        })
        .collect())
}

fn annotate_import_error(mut diagnostic: Diagnostic, path: &str) -> Diagnostic {
    diagnostic.message = format!("in import '{}': {}", path, diagnostic.message);
    diagnostic
}

/// Reject absolute paths, parent escapes, and URLs.
fn check_path_shape(path: &str, line: usize, column: usize) -> Result<(), Diagnostic> {
    let reject = |why: &str| {
        Err(Diagnostic::new(
            ErrorCode::F601,
            format!("invalid import path '{}': {}", path, why),
            line,
            column,
        ))
    };
    if path.is_empty() {
        return reject("empty path");
    }
    if path.contains("://") {
        return reject("URLs cannot be imported");
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return reject("path must be relative");
    }
    if path.contains('\\') {
        return reject("use '/' as the separator");
    }
    if path.split('/').any(|seg| seg == "..") {
        return reject("'..' segments are not allowed");
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == ".") {
        return reject("path must be normalized");
    }
    Ok(())
}

fn resolve_under_roots(path: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    for root in roots {
        let candidate = root.join(Path::new(path));
        if candidate.is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }
    None
}

/// Collapse duplicate facet names in load order.
///
/// The canonicalizer calls this after conditional pruning, so only
/// occurrences that survived their own `if` take part in the merge.
pub fn collapse(facets: Vec<Facet>, strict_merge: bool) -> Result<Vec<Facet>, Diagnostic> {
    let mut out: Vec<Facet> = Vec::with_capacity(facets.len());
    for facet in facets {
        let existing = out.iter_mut().find(|f| f.name == facet.name);
        match existing {
            None => out.push(facet),
            Some(slot) => {
                if facet.strategy == MergeStrategy::Replace {
                    *slot = facet;
                } else {
                    let merged = merge_facet(slot.clone(), facet, strict_merge)?;
                    *slot = merged;
                }
            }
        }
    }
    Ok(out)
}

fn merge_facet(base: Facet, over: Facet, strict: bool) -> Result<Facet, Diagnostic> {
    let mut attrs = base.attrs;
    for (key, value) in over.attrs {
        match attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => attrs.push((key, value)),
        }
    }
    let body = merge_body(base.body, over.body, strict, over.line, over.column)?;
    Ok(Facet {
        name: base.name,
        anchor: over.anchor.or(base.anchor),
        attrs,
        body,
        strategy: base.strategy,
        line: base.line,
        column: base.column,
    })
}

fn merge_body(
    base: Body,
    over: Body,
    strict: bool,
    line: usize,
    column: usize,
) -> Result<Body, Diagnostic> {
    match (base, over) {
        (base, Body::Empty) => Ok(base),
        (Body::Empty, over) => Ok(over),
        (Body::Mapping(a), Body::Mapping(b)) => {
            Ok(Body::Mapping(merge_mapping(a, b, strict, line, column)?))
        }
        (Body::List(mut a), Body::List(b)) => {
            a.items.extend(b.items);
            Ok(Body::List(a))
        }
        (_, over) => {
            if strict {
                Err(Diagnostic::new(
                    ErrorCode::F605,
                    "mapping and list bodies cannot merge under strict merge",
                    line,
                    column,
                ))
            } else {
                Ok(over)
            }
        }
    }
}

fn merge_mapping(
    base: MappingBlock,
    over: MappingBlock,
    strict: bool,
    line: usize,
    column: usize,
) -> Result<MappingBlock, Diagnostic> {
    let mut pairs = base.pairs;
    for pair in over.pairs {
        match pairs.iter_mut().find(|p| p.key == pair.key) {
            None => pairs.push(pair),
            Some(slot) => {
                let existing = std::mem::replace(&mut slot.value, Value::new(ValueKind::Null, 0, 0));
                slot.value = merge_value(existing, pair.value, strict, line, column)?;
                if pair.pipeline.is_some() {
                    slot.pipeline = pair.pipeline;
                }
            }
        }
    }
    Ok(MappingBlock { pairs })
}

fn merge_value(
    base: Value,
    over: Value,
    strict: bool,
    line: usize,
    column: usize,
) -> Result<Value, Diagnostic> {
    let merged = match (base.kind, over.kind) {
        (ValueKind::NestedMap(a), ValueKind::NestedMap(b)) => {
            let block = merge_mapping(a, b, strict, line, column)?;
            Value::new(ValueKind::NestedMap(block), base.line, base.column)
        }
        (ValueKind::NestedList(mut a), ValueKind::NestedList(b)) => {
            a.items.extend(b.items);
            Value::new(ValueKind::NestedList(a), base.line, base.column)
        }
        (base_kind, over_kind) => {
            let base_is_map = matches!(base_kind, ValueKind::NestedMap(_) | ValueKind::InlineMap(_));
            let base_is_list =
                matches!(base_kind, ValueKind::NestedList(_) | ValueKind::InlineList(_));
            let over_is_map = matches!(over_kind, ValueKind::NestedMap(_) | ValueKind::InlineMap(_));
            let over_is_list =
                matches!(over_kind, ValueKind::NestedList(_) | ValueKind::InlineList(_));
            let shape_conflict =
                (base_is_map && over_is_list) || (base_is_list && over_is_map);
            if strict && shape_conflict {
                return Err(Diagnostic::new(
                    ErrorCode::F605,
                    "mapping and list values cannot merge under strict merge",
                    line,
                    column,
                ));
            }
            Value::new(over_kind, over.line, over.column)
        }
    };
    Ok(merged)
}
