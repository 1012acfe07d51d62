//! Variable scope assembly, typing, substitution, and interpolation.
//!
//! The scope is flat and document-wide: in `all` resolve mode the `@vars`
//! facet is flattened to a JSON object and merged over the host-provided
//! variables (document wins per top-level key); in `host` mode only the host
//! variables are visible. `@var_types` declares per-variable schemas that
//! the assembled scope must satisfy before any substitution happens.
//!
//! Substitution comes in two forms. A value that is `$name` or `${a.b}` is
//! replaced wholesale by the referenced value. Inside quoted strings and
//! triple-quoted bodies, `{{ path }}` and `{{ path |> lens(…) }}` embed the
//! referenced value as text. Fence bodies and attributes are never touched.

use serde_json::Value as Json;

use crate::ast::{
    Body, Document, Facet, LensArg, LensCall, ListBlock, MappingBlock, NumberLit, Value, ValueKind,
};
use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::expr;
use crate::lenses;
use crate::scalars;

/// Facet names consumed at compile time and absent from the output.
pub const COMPILE_TIME_FACETS: [&str; 3] = ["import", "vars", "var_types"];

/// Resolve mode: whether document `@vars` participate in the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Only host-supplied variables are visible.
    Host,
    /// Document `@vars` merge over host variables.
    #[default]
    All,
}

impl std::str::FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(ResolveMode::Host),
            "all" => Ok(ResolveMode::All),
            other => Err(format!("unknown resolve mode '{}'", other)),
        }
    }
}

/// Assemble the variable scope and validate it against `@var_types`.
pub fn assemble_scope(
    document: &Document,
    mode: ResolveMode,
    host_vars: &serde_json::Map<String, Json>,
) -> Result<serde_json::Map<String, Json>, Vec<Diagnostic>> {
    let mut scope = host_vars.clone();

    // Scope assembly runs before duplicate-facet collapse, so a document may
    // still hold several `@vars` facets (imported plus local); later
    // definitions win per key, matching the collapse order.
    if mode == ResolveMode::All {
        for facet in document.facets.iter().filter(|f| f.name == "vars") {
            let flattened = flatten_vars(facet).map_err(|d| vec![d])?;
            for (key, value) in flattened {
                scope.insert(key, value);
            }
        }
    }

    let mut diagnostics = Diagnostics::new();
    for facet in document.facets.iter().filter(|f| f.name == "var_types") {
        validate_types(facet, &scope, &mut diagnostics);
    }
    if diagnostics.is_empty() {
        Ok(scope)
    } else {
        Err(diagnostics.into_vec())
    }
}

/// Convert the `@vars` body to a JSON object of literals.
fn flatten_vars(facet: &Facet) -> Result<serde_json::Map<String, Json>, Diagnostic> {
    match &facet.body {
        Body::Empty => Ok(serde_json::Map::new()),
        Body::Mapping(block) => {
            let mut map = serde_json::Map::new();
            for pair in &block.pairs {
                if pair.pipeline.is_some() {
                    return Err(Diagnostic::new(
                        ErrorCode::F101,
                        "@vars entries are plain literals; pipelines are not allowed",
                        pair.line,
                        pair.column,
                    ));
                }
                map.insert(pair.key.clone(), literal_json(&pair.value)?);
            }
            Ok(map)
        }
        Body::List(_) => Err(Diagnostic::new(
            ErrorCode::F101,
            "@vars takes a mapping body",
            facet.line,
            facet.column,
        )),
    }
}

/// Convert a literal AST value to JSON, rejecting anything that needs a
/// later pipeline stage (references, anchors, aliases).
pub fn literal_json(value: &Value) -> Result<Json, Diagnostic> {
    match &value.kind {
        ValueKind::Str { value: s, .. } => Ok(Json::String(s.clone())),
        ValueKind::Number(n) => Ok(Json::Number(n.to_json())),
        ValueKind::Bool(b) => Ok(Json::Bool(*b)),
        ValueKind::Null => Ok(Json::Null),
        ValueKind::Ident(name) => Ok(Json::String(name.clone())),
        ValueKind::Fence { body, .. } => Ok(Json::String(body.clone())),
        ValueKind::Ext { ext, text } => {
            Ok(Json::String(scalars::to_output_string(*ext, text)))
        }
        ValueKind::InlineList(values) => {
            let mut items = Vec::with_capacity(values.len());
            for v in values {
                items.push(literal_json(v)?);
            }
            Ok(Json::Array(items))
        }
        ValueKind::InlineMap(entries) => {
            let mut map = serde_json::Map::new();
            for (key, v) in entries {
                map.insert(key.clone(), literal_json(v)?);
            }
            Ok(Json::Object(map))
        }
        ValueKind::NestedMap(block) => {
            let mut map = serde_json::Map::new();
            for pair in &block.pairs {
                map.insert(pair.key.clone(), literal_json(&pair.value)?);
            }
            Ok(Json::Object(map))
        }
        ValueKind::NestedList(block) => {
            let mut items = Vec::with_capacity(block.items.len());
            for item in &block.items {
                items.push(literal_json(&item.value)?);
            }
            Ok(Json::Array(items))
        }
        ValueKind::Resolved(json) => Ok(json.clone()),
        ValueKind::VarRef(_) | ValueKind::AnchorDef { .. } | ValueKind::Alias(_) => {
            Err(Diagnostic::new(
                ErrorCode::F101,
                "references and anchors are not allowed here",
                value.line,
                value.column,
            ))
        }
    }
}

/// Check every variable named in `@var_types` against its schema.
fn validate_types(
    facet: &Facet,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) {
    let Body::Mapping(block) = &facet.body else {
        diagnostics.push(Diagnostic::new(
            ErrorCode::F401,
            "@var_types takes a mapping body",
            facet.line,
            facet.column,
        ));
        return;
    };

    for pair in &block.pairs {
        let schema = match literal_json(&pair.value) {
            Ok(Json::Object(map)) => map,
            Ok(_) => {
                diagnostics.push(Diagnostic::new(
                    ErrorCode::F401,
                    format!("schema for '{}' must be an object", pair.key),
                    pair.line,
                    pair.column,
                ));
                continue;
            }
            Err(diag) => {
                diagnostics.push(diag);
                continue;
            }
        };
        check_one(&pair.key, &schema, scope, pair.line, pair.column, diagnostics);
    }
}

fn check_one(
    name: &str,
    schema: &serde_json::Map<String, Json>,
    scope: &serde_json::Map<String, Json>,
    line: usize,
    column: usize,
    diagnostics: &mut Diagnostics,
) {
    let Some(Json::String(expected)) = schema.get("type") else {
        diagnostics.push(Diagnostic::new(
            ErrorCode::F401,
            format!("schema for '{}' is missing a 'type' string", name),
            line,
            column,
        ));
        return;
    };

    let Some(value) = scope.get(name) else {
        diagnostics.push(Diagnostic::new(
            ErrorCode::F451,
            format!("variable '{}' is declared in @var_types but not defined", name),
            line,
            column,
        ));
        return;
    };

    let type_ok = match expected.as_str() {
        "string" => value.is_string(),
        "int" => value.as_i64().is_some(),
        "float" => value.is_number(),
        "bool" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        other => {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F401,
                format!("schema for '{}' names unknown type '{}'", name, other),
                line,
                column,
            ));
            return;
        }
    };
    if !type_ok {
        diagnostics.push(Diagnostic::new(
            ErrorCode::F451,
            format!(
                "variable '{}' must be {} but is {}",
                name,
                expected,
                lenses::kind_name(value)
            ),
            line,
            column,
        ));
        return;
    }

    if let Some(allowed) = schema.get("enum") {
        let Json::Array(allowed) = allowed else {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F401,
                format!("schema for '{}' has a non-array 'enum'", name),
                line,
                column,
            ));
            return;
        };
        if !allowed.iter().any(|v| expr::json_eq(v, value)) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F452,
                format!("variable '{}' is not one of its allowed values", name),
                line,
                column,
            ));
        }
    }

    if let Some(min) = schema.get("min").and_then(|v| v.as_f64()) {
        if value.as_f64().map(|v| v < min).unwrap_or(false) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F452,
                format!("variable '{}' is below its minimum of {}", name, min),
                line,
                column,
            ));
        }
    }
    if let Some(max) = schema.get("max").and_then(|v| v.as_f64()) {
        if value.as_f64().map(|v| v > max).unwrap_or(false) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F452,
                format!("variable '{}' is above its maximum of {}", name, max),
                line,
                column,
            ));
        }
    }

    if let Some(pattern) = schema.get("pattern") {
        let Json::String(pattern) = pattern else {
            diagnostics.push(Diagnostic::new(
                ErrorCode::F401,
                format!("schema for '{}' has a non-string 'pattern'", name),
                line,
                column,
            ));
            return;
        };
        let anchored = format!("^(?:{})$", pattern);
        match regex::Regex::new(&anchored) {
            Ok(re) => {
                let Some(text) = value.as_str() else {
                    diagnostics.push(Diagnostic::new(
                        ErrorCode::F452,
                        format!("variable '{}' has a pattern but is not a string", name),
                        line,
                        column,
                    ));
                    return;
                };
                if !re.is_match(text) {
                    diagnostics.push(Diagnostic::new(
                        ErrorCode::F452,
                        format!("variable '{}' does not match its pattern", name),
                        line,
                        column,
                    ));
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::new(
                    ErrorCode::F401,
                    format!("schema pattern for '{}' does not compile: {}", name, e),
                    line,
                    column,
                ));
            }
        }
    }
}

/// Perform scalar substitution and string interpolation across a document.
pub fn substitute(
    document: Document,
    scope: &serde_json::Map<String, Json>,
) -> Result<Document, Vec<Diagnostic>> {
    let mut diagnostics = Diagnostics::new();
    let facets = document
        .facets
        .into_iter()
        .map(|facet| {
            if COMPILE_TIME_FACETS.contains(&facet.name.as_str()) {
                return facet;
            }
            let body = match facet.body {
                Body::Empty => Body::Empty,
                Body::Mapping(block) => {
                    Body::Mapping(substitute_mapping(block, scope, &mut diagnostics))
                }
                Body::List(block) => Body::List(substitute_list(block, scope, &mut diagnostics)),
            };
            Facet { body, ..facet }
        })
        .collect();
    if diagnostics.is_empty() {
        Ok(Document { facets })
    } else {
        Err(diagnostics.into_vec())
    }
}

fn substitute_mapping(
    block: MappingBlock,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> MappingBlock {
    MappingBlock {
        pairs: block
            .pairs
            .into_iter()
            .map(|mut pair| {
                pair.value = substitute_value(pair.value, scope, diagnostics);
                pair
            })
            .collect(),
    }
}

fn substitute_list(
    block: ListBlock,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> ListBlock {
    ListBlock {
        items: block
            .items
            .into_iter()
            .map(|mut item| {
                item.value = substitute_value(item.value, scope, diagnostics);
                item
            })
            .collect(),
    }
}

fn substitute_value(
    value: Value,
    scope: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> Value {
    let Value { kind, line, column } = value;
    let kind = match kind {
        ValueKind::VarRef(path) => match expr::resolve_path(scope, &path) {
            Some(json) => ValueKind::Resolved(json),
            None => {
                diagnostics.push(Diagnostic::new(
                    ErrorCode::F404,
                    format!("variable path '{}' is not defined", path),
                    line,
                    column,
                ));
                ValueKind::Null
            }
        },
        ValueKind::Str { value: s, triple } => {
            match interpolate(&s, scope, line, column) {
                Ok(out) => ValueKind::Str { value: out, triple },
                Err(diag) => {
                    diagnostics.push(diag);
                    ValueKind::Str { value: s, triple }
                }
            }
        }
        ValueKind::InlineMap(entries) => ValueKind::InlineMap(
            entries
                .into_iter()
                .map(|(k, v)| (k, substitute_value(v, scope, diagnostics)))
                .collect(),
        ),
        ValueKind::InlineList(values) => ValueKind::InlineList(
            values
                .into_iter()
                .map(|v| substitute_value(v, scope, diagnostics))
                .collect(),
        ),
        ValueKind::NestedMap(block) => {
            ValueKind::NestedMap(substitute_mapping(block, scope, diagnostics))
        }
        ValueKind::NestedList(block) => {
            ValueKind::NestedList(substitute_list(block, scope, diagnostics))
        }
        ValueKind::AnchorDef { label, inner } => ValueKind::AnchorDef {
            label,
            inner: Box::new(substitute_value(*inner, scope, diagnostics)),
        },
        // Fences are verbatim; the rest carry no interpolation surface.
        other => other,
    };
    Value { kind, line, column }
}

/// Expand `{{ … }}` segments inside a string value.
pub fn interpolate(
    input: &str,
    scope: &serde_json::Map<String, Json>,
    line: usize,
    column: usize,
) -> Result<String, Diagnostic> {
    if !input.contains("{{") {
        return Ok(input.to_string());
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(Diagnostic::new(
                ErrorCode::F001,
                "unterminated '{{' interpolation",
                line,
                column,
            ));
        };
        let inner = &after[..end];
        let value = evaluate_interpolation(inner, scope, line, column)?;
        out.push_str(&embed(&value));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Resolve `path` or `path |> lens(…) |> …` to a value.
fn evaluate_interpolation(
    inner: &str,
    scope: &serde_json::Map<String, Json>,
    line: usize,
    column: usize,
) -> Result<Json, Diagnostic> {
    let mut segments = inner.split("|>");
    let path = segments.next().unwrap_or("").trim();
    if !scalars::is_dot_path(path) {
        return Err(Diagnostic::new(
            ErrorCode::F402A,
            format!("'{}' is not a variable path", path),
            line,
            column,
        ));
    }
    let value = expr::resolve_path(scope, path).ok_or_else(|| {
        Diagnostic::new(
            ErrorCode::F402A,
            format!("interpolation path '{}' is not defined", path),
            line,
            column,
        )
    })?;

    let mut calls = Vec::new();
    for segment in segments {
        let call = parse_interp_call(segment.trim(), line, column)?;
        calls.push(lenses::resolve_call(&call, Some(scope))?);
    }
    lenses::apply_pipeline(value, &calls)
}

/// How an interpolated value reads inside the surrounding string.
fn embed(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Null => "null".to_string(),
        other => serde_json::to_string(other).expect("JSON values serialize"),
    }
}

/// Parse one `name(arg, key=value)` lens segment from an interpolation.
fn parse_interp_call(text: &str, line: usize, column: usize) -> Result<LensCall, Diagnostic> {
    let bad = |msg: String| Diagnostic::new(ErrorCode::F801, msg, line, column);
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    let mut name = String::new();
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        name.push(chars[i]);
        i += 1;
    }
    if name.is_empty() {
        return Err(bad(format!("'{}' is not a lens call", text)));
    }

    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    while i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    if i < chars.len() {
        if chars[i] != '(' {
            return Err(bad(format!("'{}' is not a lens call", text)));
        }
        i += 1;
        loop {
            while i < chars.len() && chars[i] == ' ' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(bad("unterminated lens arguments".to_string()));
            }
            if chars[i] == ')' {
                i += 1;
                break;
            }

            // Keyword prefix?
            let mut key = None;
            if chars[i].is_ascii_alphabetic() || chars[i] == '_' {
                let mut word = String::new();
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    word.push(chars[j]);
                    j += 1;
                }
                let mut k = j;
                while k < chars.len() && chars[k] == ' ' {
                    k += 1;
                }
                if k < chars.len() && chars[k] == '=' {
                    key = Some(word);
                    i = k + 1;
                    while i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }
                }
            }

            let (arg, consumed) = parse_interp_literal(&chars[i..])
                .ok_or_else(|| bad(format!("bad lens argument in '{}'", text)))?;
            i += consumed;
            match key {
                Some(key) => kwargs.push((key, arg)),
                None => args.push(arg),
            }

            while i < chars.len() && chars[i] == ' ' {
                i += 1;
            }
            if i < chars.len() && chars[i] == ',' {
                i += 1;
                continue;
            }
        }
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
    }
    if i != chars.len() {
        return Err(bad(format!("trailing input after lens call '{}'", text)));
    }

    Ok(LensCall {
        name,
        args,
        kwargs,
        line,
        column,
    })
}

fn parse_interp_literal(chars: &[char]) -> Option<(LensArg, usize)> {
    let first = *chars.first()?;
    if first == '"' || first == '\'' {
        let mut s = String::new();
        let mut i = 1;
        while i < chars.len() {
            if chars[i] == first {
                return Some((LensArg::Str(s), i + 1));
            }
            if chars[i] == '\\' && i + 1 < chars.len() {
                s.push(chars[i + 1]);
                i += 2;
            } else {
                s.push(chars[i]);
                i += 1;
            }
        }
        return None;
    }
    if first == '$' {
        let mut path = String::new();
        let mut i = 1;
        let braced = chars.get(1) == Some(&'{');
        if braced {
            i = 2;
        }
        while i < chars.len()
            && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
        {
            path.push(chars[i]);
            i += 1;
        }
        if braced {
            if chars.get(i) != Some(&'}') {
                return None;
            }
            i += 1;
        }
        if !scalars::is_dot_path(&path) {
            return None;
        }
        return Some((LensArg::VarRef(path), i));
    }
    if first.is_ascii_digit() || first == '-' {
        let mut text = String::new();
        let mut i = 0;
        if first == '-' {
            text.push('-');
            i = 1;
        }
        let mut is_float = false;
        while i < chars.len() {
            let c = chars[i];
            if c.is_ascii_digit() {
                text.push(c);
                i += 1;
            } else if c == '.' && chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                text.push('.');
                i += 1;
            } else {
                break;
            }
        }
        if text.is_empty() || text == "-" {
            return None;
        }
        let lit = if is_float {
            NumberLit::Float(text.parse().ok()?)
        } else {
            NumberLit::Int(text.parse().ok()?)
        };
        return Some((LensArg::Number(lit), i));
    }
    // Bare keywords.
    for (word, arg) in [
        ("true", LensArg::Bool(true)),
        ("false", LensArg::Bool(false)),
        ("null", LensArg::Null),
    ] {
        if chars.len() >= word.len() && chars[..word.len()].iter().collect::<String>() == word {
            let next = chars.get(word.len());
            let boundary = next
                .map(|c| !c.is_ascii_alphanumeric() && *c != '_')
                .unwrap_or(true);
            if boundary {
                return Some((arg, word.len()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser;
    use serde_json::json;

    fn doc(src: &str) -> Document {
        parser::parse(lexer::tokenize(src).unwrap()).unwrap()
    }

    fn map(v: serde_json::Value) -> serde_json::Map<String, Json> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_scope_document_wins_in_all_mode() {
        let document = doc("@vars\n  mode: \"doc\"\n");
        let host = map(json!({"mode": "host", "extra": 1}));
        let scope = assemble_scope(&document, ResolveMode::All, &host).unwrap();
        assert_eq!(scope["mode"], json!("doc"));
        assert_eq!(scope["extra"], json!(1));
    }

    #[test]
    fn test_scope_host_mode_ignores_vars() {
        let document = doc("@vars\n  mode: \"doc\"\n");
        let host = map(json!({"mode": "host"}));
        let scope = assemble_scope(&document, ResolveMode::Host, &host).unwrap();
        assert_eq!(scope["mode"], json!("host"));
    }

    #[test]
    fn test_var_types_type_violation() {
        let document = doc("@vars\n  n: \"five\"\n@var_types\n  n: {type: \"int\"}\n");
        let err = assemble_scope(&document, ResolveMode::All, &map(json!({}))).unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F451);
    }

    #[test]
    fn test_var_types_constraint_violation() {
        let document =
            doc("@vars\n  n: 11\n@var_types\n  n: {type: \"int\", min: 0, max: 10}\n");
        let err = assemble_scope(&document, ResolveMode::All, &map(json!({}))).unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F452);
    }

    #[test]
    fn test_var_types_enum_and_pattern() {
        let document = doc(concat!(
            "@vars\n  mode: \"fast\"\n  tag: \"v1\"\n",
            "@var_types\n  mode: {type: \"string\", enum: [\"fast\", \"slow\"]}\n",
            "  tag: {type: \"string\", pattern: \"v[0-9]+\"}\n",
        ));
        assert!(assemble_scope(&document, ResolveMode::All, &map(json!({}))).is_ok());
    }

    #[test]
    fn test_var_types_bad_schema_is_f401() {
        let document = doc("@vars\n  n: 1\n@var_types\n  n: {type: \"integer\"}\n");
        let err = assemble_scope(&document, ResolveMode::All, &map(json!({}))).unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F401);
    }

    #[test]
    fn test_scalar_substitution_replaces_whole_value() {
        let document = doc("@out\n  greetings: $greetings\n");
        let scope = map(json!({"greetings": ["Hi", "Hey"]}));
        let document = substitute(document, &scope).unwrap();
        let Body::Mapping(block) = &document.facets[0].body else {
            panic!("expected mapping");
        };
        assert_eq!(
            block.pairs[0].value.kind,
            ValueKind::Resolved(json!(["Hi", "Hey"]))
        );
    }

    #[test]
    fn test_missing_substitution_path_is_f404() {
        let document = doc("@out\n  v: $missing\n");
        let err = substitute(document, &map(json!({}))).unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F404);
    }

    #[test]
    fn test_interpolation_in_strings() {
        let scope = map(json!({"user": {"name": "Alex"}, "n": 3}));
        assert_eq!(
            interpolate("hello {{ user.name }}, {{ n }} items", &scope, 1, 1).unwrap(),
            "hello Alex, 3 items"
        );
    }

    #[test]
    fn test_interpolation_missing_path_is_f402a() {
        let err = interpolate("{{ nope }}", &map(json!({})), 4, 2).unwrap_err();
        assert_eq!(err.code, ErrorCode::F402A);
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_interpolation_with_lens_pipeline() {
        let scope = map(json!({"greetings": ["Hi", "Hello", "Hey"], "seed": 42}));
        assert_eq!(
            interpolate("{{ greetings |> choose(seed=$seed) }}", &scope, 1, 1).unwrap(),
            "Hi"
        );
    }

    #[test]
    fn test_interpolation_embeds_containers_as_json() {
        let scope = map(json!({"xs": [1, 2]}));
        assert_eq!(interpolate("v={{ xs }}", &scope, 1, 1).unwrap(), "v=[1,2]");
    }

    #[test]
    fn test_fences_are_never_interpolated() {
        let document = doc("@a\n  code:\n    ```\n    {{ not_a_var }}\n    ```\n");
        let document = substitute(document, &map(json!({}))).unwrap();
        let Body::Mapping(block) = &document.facets[0].body else {
            panic!("expected mapping");
        };
        assert!(matches!(
            block.pairs[0].value.kind,
            ValueKind::Fence { .. }
        ));
    }
}
