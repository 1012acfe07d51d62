//! Canonicalization pipeline orchestration.
//!
//! The pipeline runs a fixed stage order and nothing else:
//!
//! 1. Lexical normalization and tokenization
//! 2. Parsing
//! 3. Import expansion (splicing only)
//! 4. Variable scope assembly and `@var_types` validation
//! 5. Conditional pruning of facets and list items
//! 6. Duplicate-facet collapse (merge by name in load order)
//! 7. Scalar substitution and string interpolation
//! 8. Lens pipelines, in source order
//! 9. Anchor and alias resolution
//! 10. JSON construction (extended scalars and fences become strings here)
//!
//! Pruning runs before anchors on purpose: an alias whose definition was
//! pruned away is an error, so authors cannot alias across conditional
//! boundaries. Pruning also runs before collapse, so a facet-level `if`
//! governs exactly the occurrence it is written on — a surviving facet
//! never inherits a condition from, nor loses content to, another
//! occurrence of the same name. Every stage either returns a revised tree
//! or diagnostics; the first failing stage short-circuits the rest.

use std::path::PathBuf;

use serde_json::Value as Json;

use crate::anchors;
use crate::ast::{AttrValue, Body, Document, Facet, ListBlock, MappingBlock, Value, ValueKind};
use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::expr;
use crate::imports;
use crate::lenses;
use crate::lexer;
use crate::parser;
use crate::vars::{self, ResolveMode, COMPILE_TIME_FACETS};

/// Everything `canonize` needs besides the source text.
#[derive(Debug, Clone, Default)]
pub struct CanonizeOptions {
    pub resolve_mode: ResolveMode,
    pub host_vars: serde_json::Map<String, Json>,
    pub import_roots: Vec<PathBuf>,
    pub strict_merge: bool,
}

/// Run the full pipeline from source bytes to one canonical JSON value.
pub fn canonicalize(source: &[u8], options: &CanonizeOptions) -> Result<Json, Vec<Diagnostic>> {
    let document = parse_source(source).map_err(|d| vec![d])?;
    let document = imports::expand(document, &options.import_roots)?;
    let scope = vars::assemble_scope(&document, options.resolve_mode, &options.host_vars)?;
    let document = prune(document, &scope)?;
    let facets = imports::collapse(document.facets, options.strict_merge).map_err(|d| vec![d])?;
    let document = Document { facets };
    let document = vars::substitute(document, &scope)?;
    let document = apply_pipelines(document)?;
    let document = anchors::resolve(document)?;
    build(&document).map_err(|d| vec![d])
}

/// Stages 1–2: bytes to AST.
pub fn parse_source(source: &[u8]) -> Result<Document, Diagnostic> {
    let text = lexer::normalize(source)?;
    let tokens = lexer::tokenize(&text)?;
    parser::parse(tokens)
}

/// Stage 5: drop facets and list items whose `if` evaluates falsy.
fn prune(
    document: Document,
    scope: &serde_json::Map<String, Json>,
) -> Result<Document, Vec<Diagnostic>> {
    let mut diagnostics = Diagnostics::new();
    let mut facets = Vec::with_capacity(document.facets.len());
    for facet in document.facets {
        match facet_condition(&facet) {
            None => facets.push(prune_facet_body(facet, scope, &mut diagnostics)),
            Some((text, line, column)) => match expr::evaluate(&text, scope, line, column) {
                Ok(value) => {
                    if expr::is_truthy(&value) {
                        facets.push(prune_facet_body(facet, scope, &mut diagnostics));
                    }
                }
                Err(diag) => diagnostics.push(diag),
            },
        }
    }
    if diagnostics.is_empty() {
        Ok(Document { facets })
    } else {
        Err(diagnostics.into_vec())
    }
}

fn facet_condition(facet: &Facet) -> Option<(String, usize, usize)> {
    match facet.attr("if") {
        Some(AttrValue::Str(text)) => Some((text.clone(), facet.line, facet.column)),
        _ => None,
    }
}

fn prune_facet_body(
    facet: Facet,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> Facet {
    let body = match facet.body {
        Body::Empty => Body::Empty,
        Body::Mapping(block) => Body::Mapping(prune_mapping(block, scope, diagnostics)),
        Body::List(block) => Body::List(prune_list(block, scope, diagnostics)),
    };
    Facet { body, ..facet }
}

fn prune_mapping(
    block: MappingBlock,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> MappingBlock {
    MappingBlock {
        pairs: block
            .pairs
            .into_iter()
            .map(|mut pair| {
                pair.value = prune_value(pair.value, scope, diagnostics);
                pair
            })
            .collect(),
    }
}

fn prune_list(
    block: ListBlock,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> ListBlock {
    let mut items = Vec::with_capacity(block.items.len());
    for mut item in block.items {
        let keep = match &item.condition {
            None => true,
            Some(text) => match expr::evaluate(text, scope, item.line, item.column) {
                Ok(value) => expr::is_truthy(&value),
                Err(diag) => {
                    diagnostics.push(diag);
                    false
                }
            },
        };
        if keep {
            item.condition = None;
            item.value = prune_value(item.value, scope, diagnostics);
            items.push(item);
        }
    }
    ListBlock { items }
}

fn prune_value(
    value: Value,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> Value {
    let Value { kind, line, column } = value;
    let kind = match kind {
        ValueKind::NestedMap(block) => {
            ValueKind::NestedMap(prune_mapping(block, scope, diagnostics))
        }
        ValueKind::NestedList(block) => ValueKind::NestedList(prune_list(block, scope, diagnostics)),
        ValueKind::AnchorDef { label, inner } => ValueKind::AnchorDef {
            label,
            inner: Box::new(prune_value(*inner, scope, diagnostics)),
        },
        other => other,
    };
    Value { kind, line, column }
}

/// Stage 8: apply every lens pipeline, left to right per value.
fn apply_pipelines(document: Document) -> Result<Document, Vec<Diagnostic>> {
    let facets = document
        .facets
        .into_iter()
        .map(|facet| {
            if COMPILE_TIME_FACETS.contains(&facet.name.as_str()) {
                return Ok(facet);
            }
            let body = match facet.body {
                Body::Empty => Body::Empty,
                Body::Mapping(block) => Body::Mapping(pipeline_mapping(block)?),
                Body::List(block) => Body::List(pipeline_list(block)?),
            };
            Ok(Facet { body, ..facet })
        })
        .collect::<Result<Vec<_>, Diagnostic>>()
        .map_err(|d| vec![d])?;
    Ok(Document { facets })
}

fn pipeline_mapping(block: MappingBlock) -> Result<MappingBlock, Diagnostic> {
    let mut pairs = Vec::with_capacity(block.pairs.len());
    for mut pair in block.pairs {
        let pipeline = pair.pipeline.take();
        pair.value = match pipeline {
            None => descend_value(pair.value)?,
            Some(pipeline) => run_pipeline(pair.value, &pipeline.calls)?,
        };
        pairs.push(pair);
    }
    Ok(MappingBlock { pairs })
}

fn pipeline_list(block: ListBlock) -> Result<ListBlock, Diagnostic> {
    let mut items = Vec::with_capacity(block.items.len());
    for mut item in block.items {
        let pipeline = item.pipeline.take();
        item.value = match pipeline {
            None => descend_value(item.value)?,
            Some(pipeline) => run_pipeline(item.value, &pipeline.calls)?,
        };
        items.push(item);
    }
    Ok(ListBlock { items })
}

fn descend_value(value: Value) -> Result<Value, Diagnostic> {
    let Value { kind, line, column } = value;
    let kind = match kind {
        ValueKind::NestedMap(block) => ValueKind::NestedMap(pipeline_mapping(block)?),
        ValueKind::NestedList(block) => ValueKind::NestedList(pipeline_list(block)?),
        ValueKind::AnchorDef { label, inner } => ValueKind::AnchorDef {
            label,
            inner: Box::new(descend_value(*inner)?),
        },
        other => other,
    };
    Ok(Value { kind, line, column })
}

fn run_pipeline(value: Value, calls: &[crate::ast::LensCall]) -> Result<Value, Diagnostic> {
    let mut resolved = Vec::with_capacity(calls.len());
    for call in calls {
        resolved.push(lenses::resolve_call(call, None)?);
    }

    let Value { kind, line, column } = value;
    let kind = match kind {
        // The anchor wrapper stays; the registered value is the lens output.
        ValueKind::AnchorDef { label, inner } => {
            let input = vars::literal_json(&inner)?;
            let output = lenses::apply_pipeline(input, &resolved)?;
            ValueKind::AnchorDef {
                label,
                inner: Box::new(Value::new(ValueKind::Resolved(output), line, column)),
            }
        }
        kind => {
            let input = vars::literal_json(&Value::new(kind, line, column))?;
            let output = lenses::apply_pipeline(input, &resolved)?;
            ValueKind::Resolved(output)
        }
    };
    Ok(Value { kind, line, column })
}

/// Stage 10: build the root JSON object in source order.
fn build(document: &Document) -> Result<Json, Diagnostic> {
    let mut root = serde_json::Map::new();
    for facet in &document.facets {
        if COMPILE_TIME_FACETS.contains(&facet.name.as_str()) {
            continue;
        }

        let mut attrs = serde_json::Map::new();
        for (key, value) in &facet.attrs {
            if key == "if" {
                continue;
            }
            attrs.insert(key.clone(), value.to_json());
        }

        let mut obj = serde_json::Map::new();
        obj.insert("_attrs".to_string(), Json::Object(attrs));
        match &facet.body {
            Body::Empty => {}
            Body::Mapping(block) => {
                for pair in &block.pairs {
                    obj.insert(pair.key.clone(), vars::literal_json(&pair.value)?);
                }
            }
            Body::List(block) => {
                let mut items = Vec::with_capacity(block.items.len());
                for item in &block.items {
                    items.push(vars::literal_json(&item.value)?);
                }
                obj.insert("items".to_string(), Json::Array(items));
            }
        }

        if root.contains_key(&facet.name) {
            return Err(Diagnostic::new(
                ErrorCode::F999,
                format!("facet '{}' was not collapsed before emission", facet.name),
                facet.line,
                facet.column,
            ));
        }
        root.insert(facet.name.clone(), Json::Object(obj));
    }
    Ok(Json::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon(src: &str) -> Json {
        canonicalize(src.as_bytes(), &CanonizeOptions::default()).unwrap()
    }

    #[test]
    fn test_simple_mapping_facet() {
        let out = canon("@user(name=\"Alex\")\n  message: \"Hello, world!\"\n");
        assert_eq!(
            out,
            json!({"user": {"_attrs": {"name": "Alex"}, "message": "Hello, world!"}})
        );
    }

    #[test]
    fn test_list_body_becomes_items() {
        let out = canon("@plan\n  - \"a\"\n  - \"b\"\n");
        assert_eq!(out, json!({"plan": {"_attrs": {}, "items": ["a", "b"]}}));
    }

    #[test]
    fn test_key_order_follows_source() {
        let out = canon("@a\n  z: 1\n  y: 2\n  x: 3\n");
        let keys: Vec<&String> = out["a"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["_attrs", "z", "y", "x"]);
    }

    #[test]
    fn test_compile_time_facets_absent() {
        let out = canon("@vars\n  mode: \"x\"\n@user\n  msg: \"hi\"\n");
        assert_eq!(out.as_object().unwrap().len(), 1);
        assert!(out.get("vars").is_none());
    }

    #[test]
    fn test_conditional_facet_pruned() {
        let out = canon(concat!(
            "@vars\n  mode: \"user\"\n",
            "@system(if=\"mode == 'expert'\")\n  role: \"expert\"\n",
            "@user\n  msg: \"hi\"\n",
        ));
        assert_eq!(out, json!({"user": {"_attrs": {}, "msg": "hi"}}));
    }

    #[test]
    fn test_conditional_list_items_pruned() {
        let out = canon(concat!(
            "@vars\n  fast: true\n",
            "@plan\n  - \"always\"\n  - \"sometimes\" if=\"not fast\"\n",
        ));
        assert_eq!(out["plan"]["items"], json!(["always"]));
    }

    #[test]
    fn test_pruned_anchor_breaks_alias() {
        let err = canonicalize(
            concat!(
                "@vars\n  on: false\n",
                "@a(if=\"on\")\n  v &s: 1\n",
                "@a\n  w: *s\n",
            )
            .as_bytes(),
            &CanonizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F201);
    }

    #[test]
    fn test_condition_governs_only_its_own_occurrence() {
        let out = canon(concat!(
            "@vars\n  on: false\n",
            "@a(if=\"on\")\n  gone: 1\n",
            "@a\n  kept: 2\n",
        ));
        assert_eq!(out["a"], json!({"_attrs": {}, "kept": 2}));
    }

    #[test]
    fn test_alias_resolves_across_merged_same_name_facets() {
        let out = canon("@a\n  v &s: \"x\"\n@a\n  w: *s\n");
        assert_eq!(out["a"]["v"], json!("x"));
        assert_eq!(out["a"]["w"], json!("x"));
    }

    #[test]
    fn test_pipeline_applied_before_anchor_registration() {
        let out = canon("@a\n  v &s: \"  x  \" |> trim\n  w: *s\n");
        assert_eq!(out["a"]["v"], json!("x"));
        assert_eq!(out["a"]["w"], json!("x"));
    }

    #[test]
    fn test_extended_scalars_serialize_as_text() {
        let out = canon("@a\n  t: 30s\n  s: 4KB\n  at: @2024-01-15T10:30:00Z\n  r: /a+/i\n");
        assert_eq!(out["a"]["t"], json!("30s"));
        assert_eq!(out["a"]["s"], json!("4KB"));
        assert_eq!(out["a"]["at"], json!("2024-01-15T10:30:00Z"));
        assert_eq!(out["a"]["r"], json!("/a+/i"));
    }

    #[test]
    fn test_fence_becomes_string() {
        let out = canon("@a\n  code:\n    ```python\n    print(1)\n    ```\n");
        assert_eq!(out["a"]["code"], json!("print(1)\n"));
    }

    #[test]
    fn test_empty_facet_keeps_attrs_only() {
        let out = canon("@marker(kind=\"section\")\n");
        assert_eq!(out, json!({"marker": {"_attrs": {"kind": "section"}}}));
    }

    #[test]
    fn test_determinism_byte_for_byte() {
        let src = concat!(
            "@vars\n  seed: 7\n  names: [\"a\", \"b\", \"c\"]\n",
            "@out\n  pick: \"{{ names |> choose(seed=$seed) }}\"\n",
            "  all: $names\n",
        );
        let a = crate::emit::to_string(&canon(src));
        let b = crate::emit::to_string(&canon(src));
        assert_eq!(a, b);
    }
}
