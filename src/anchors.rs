//! Anchor and alias resolution.
//!
//! A single traversal per facet: `&label value` registers the label and
//! leaves the value in place, `*label` is replaced by a deep structural copy
//! of the referent. Labels are scoped to their facet; aliases refer only to
//! previously defined labels, so cross-facet references and forward
//! references are undefined (F201). A label reached again while its own
//! definition is still being resolved is a cycle. Redefinition is F202.
//!
//! This stage runs after pipelines, so the value an anchor registers is the
//! value a reader sees in the output.

use std::collections::HashMap;

use crate::ast::{Body, Document, Facet, ListBlock, MappingBlock, Value, ValueKind};
use crate::diagnostics::{Diagnostic, ErrorCode};

/// Resolve every anchor and alias in the document.
pub fn resolve(document: Document) -> Result<Document, Vec<Diagnostic>> {
    let facets = document
        .facets
        .into_iter()
        .map(resolve_facet)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|d| vec![d])?;
    Ok(Document { facets })
}

fn resolve_facet(facet: Facet) -> Result<Facet, Diagnostic> {
    let mut scope = AnchorScope {
        defs: HashMap::new(),
        stack: Vec::new(),
        facet_label: facet.anchor.clone(),
    };
    let body = match facet.body {
        Body::Empty => Body::Empty,
        Body::Mapping(block) => Body::Mapping(resolve_mapping(block, &mut scope)?),
        Body::List(block) => Body::List(resolve_list(block, &mut scope)?),
    };
    Ok(Facet { body, ..facet })
}

struct AnchorScope {
    defs: HashMap<String, Value>,
    stack: Vec<String>,
    /// The facet's own `&label`, reserved so inner definitions cannot shadow
    /// it and inner aliases to it are reported as cycles.
    facet_label: Option<String>,
}

fn resolve_mapping(
    block: MappingBlock,
    scope: &mut AnchorScope,
) -> Result<MappingBlock, Diagnostic> {
    let mut pairs = Vec::with_capacity(block.pairs.len());
    for mut pair in block.pairs {
        pair.value = resolve_value(pair.value, scope)?;
        pairs.push(pair);
    }
    Ok(MappingBlock { pairs })
}

fn resolve_list(block: ListBlock, scope: &mut AnchorScope) -> Result<ListBlock, Diagnostic> {
    let mut items = Vec::with_capacity(block.items.len());
    for mut item in block.items {
        item.value = resolve_value(item.value, scope)?;
        items.push(item);
    }
    Ok(ListBlock { items })
}

fn resolve_value(value: Value, scope: &mut AnchorScope) -> Result<Value, Diagnostic> {
    let Value { kind, line, column } = value;
    let kind = match kind {
        ValueKind::AnchorDef { label, inner } => {
            if scope.defs.contains_key(&label) || scope.facet_label.as_deref() == Some(label.as_str()) {
                return Err(Diagnostic::new(
                    ErrorCode::F202,
                    format!("anchor '{}' is already defined in this facet", label),
                    line,
                    column,
                ));
            }
            scope.stack.push(label.clone());
            let resolved = resolve_value(*inner, scope)?;
            scope.stack.pop();
            scope.defs.insert(label, resolved.clone());
            resolved.kind
        }
        ValueKind::Alias(label) => {
            if scope.stack.contains(&label) || scope.facet_label.as_deref() == Some(label.as_str()) {
                return Err(Diagnostic::new(
                    ErrorCode::F201,
                    format!("anchor cycle detected through '{}'", label),
                    line,
                    column,
                ));
            }
            match scope.defs.get(&label) {
                Some(referent) => referent.kind.clone(),
                None => {
                    return Err(Diagnostic::new(
                        ErrorCode::F201,
                        format!("alias '*{}' has no anchor definition", label),
                        line,
                        column,
                    ));
                }
            }
        }
        ValueKind::InlineMap(entries) => ValueKind::InlineMap(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, resolve_value(v, scope)?)))
                .collect::<Result<Vec<_>, Diagnostic>>()?,
        ),
        ValueKind::InlineList(values) => ValueKind::InlineList(
            values
                .into_iter()
                .map(|v| resolve_value(v, scope))
                .collect::<Result<Vec<_>, Diagnostic>>()?,
        ),
        ValueKind::NestedMap(block) => ValueKind::NestedMap(resolve_mapping(block, scope)?),
        ValueKind::NestedList(block) => ValueKind::NestedList(resolve_list(block, scope)?),
        other => other,
    };
    Ok(Value { kind, line, column })
}
