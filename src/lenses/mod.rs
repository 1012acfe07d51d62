//! The lens runtime: pure, deterministic single-value transforms.
//!
//! Lenses are modeled as a registry keyed by name, each entry carrying a
//! signature descriptor (input kind plus argument contract). Resolution is a
//! lookup and invocation receives already-resolved JSON arguments. Lenses
//! never touch state outside their arguments; the only "randomness" is the
//! seeded, reproducible kind in [`random`].

pub mod random;
pub mod string_ops;

use serde_json::Value;

use crate::ast::{LensArg, LensCall};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::expr;
use crate::limits;

/// The value kind a lens consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Str,
    Array,
}

/// A lens call with its arguments resolved to JSON values.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub name: String,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
    pub line: usize,
    pub column: usize,
}

impl ResolvedCall {
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Fetch a required string argument by position.
    fn str_arg(&self, idx: usize, name: &str) -> Result<&str, Diagnostic> {
        match self.args.get(idx) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.arg_error(format!(
                "argument '{}' must be a string, not {}",
                name,
                kind_name(other)
            ))),
            None => Err(self.arg_error(format!("missing required argument '{}'", name))),
        }
    }

    /// The seed for deterministic lenses: keyword `seed` or a single
    /// positional integer. Absence is F804, a non-integer is F801.
    fn seed(&self) -> Result<i64, Diagnostic> {
        let value = self.kwarg("seed").or_else(|| self.args.first());
        match value {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                self.arg_error("seed must be an integer")
            }),
            Some(other) => Err(self.arg_error(format!(
                "seed must be an integer, not {}",
                kind_name(other)
            ))),
            None => Err(Diagnostic::new(
                ErrorCode::F804,
                format!("lens '{}' requires a seed argument", self.name),
                self.line,
                self.column,
            )),
        }
    }

    fn expect_arity(&self, positional: usize, keywords: &[&str]) -> Result<(), Diagnostic> {
        if self.args.len() > positional {
            return Err(self.arg_error(format!(
                "lens '{}' takes at most {} positional argument(s)",
                self.name, positional
            )));
        }
        for (key, _) in &self.kwargs {
            if !keywords.contains(&key.as_str()) {
                return Err(self.arg_error(format!(
                    "lens '{}' has no keyword argument '{}'",
                    self.name, key
                )));
            }
        }
        Ok(())
    }

    fn arg_error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(ErrorCode::F801, message, self.line, self.column)
    }
}

/// One registry entry: the lens name, its input contract, and its behavior.
pub struct LensSpec {
    pub name: &'static str,
    pub input: InputKind,
    run: fn(&Value, &ResolvedCall) -> Result<Value, Diagnostic>,
}

/// The immutable lens registry. Extending the set is one more entry here.
pub fn registry() -> &'static [LensSpec] {
    REGISTRY
}

const REGISTRY: &[LensSpec] = &[
    LensSpec {
        name: "trim",
        input: InputKind::Str,
        run: string_ops::run_trim,
    },
    LensSpec {
        name: "dedent",
        input: InputKind::Str,
        run: string_ops::run_dedent,
    },
    LensSpec {
        name: "squeeze_spaces",
        input: InputKind::Str,
        run: string_ops::run_squeeze_spaces,
    },
    LensSpec {
        name: "limit",
        input: InputKind::Str,
        run: string_ops::run_limit,
    },
    LensSpec {
        name: "normalize_newlines",
        input: InputKind::Str,
        run: string_ops::run_normalize_newlines,
    },
    LensSpec {
        name: "lower",
        input: InputKind::Str,
        run: string_ops::run_lower,
    },
    LensSpec {
        name: "upper",
        input: InputKind::Str,
        run: string_ops::run_upper,
    },
    LensSpec {
        name: "replace",
        input: InputKind::Str,
        run: string_ops::run_replace,
    },
    LensSpec {
        name: "regex_replace",
        input: InputKind::Str,
        run: string_ops::run_regex_replace,
    },
    LensSpec {
        name: "json_minify",
        input: InputKind::Str,
        run: string_ops::run_json_minify,
    },
    LensSpec {
        name: "strip_markdown",
        input: InputKind::Str,
        run: string_ops::run_strip_markdown,
    },
    LensSpec {
        name: "choose",
        input: InputKind::Array,
        run: random::run_choose,
    },
    LensSpec {
        name: "shuffle",
        input: InputKind::Array,
        run: random::run_shuffle,
    },
];

fn lookup(name: &str) -> Option<&'static LensSpec> {
    registry().iter().find(|spec| spec.name == name)
}

/// Resolve a parsed lens call's arguments to JSON values.
///
/// Document pipelines carry literals only; pipelines inside `{{ … }}`
/// interpolations may also reference variables, resolved against `scope`.
pub fn resolve_call(
    call: &LensCall,
    scope: Option<&serde_json::Map<String, Value>>,
) -> Result<ResolvedCall, Diagnostic> {
    let resolve_arg = |arg: &LensArg| -> Result<Value, Diagnostic> {
        Ok(match arg {
            LensArg::Str(s) => Value::String(s.clone()),
            LensArg::Number(n) => Value::Number(n.to_json()),
            LensArg::Bool(b) => Value::Bool(*b),
            LensArg::Null => Value::Null,
            LensArg::VarRef(path) => match scope {
                Some(scope) => expr::resolve_path(scope, path).ok_or_else(|| {
                    Diagnostic::new(
                        ErrorCode::F404,
                        format!("variable path '{}' is not defined", path),
                        call.line,
                        call.column,
                    )
                })?,
                None => {
                    return Err(Diagnostic::new(
                        ErrorCode::F801,
                        "lens arguments must be literals",
                        call.line,
                        call.column,
                    ));
                }
            },
        })
    };

    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(resolve_arg(arg)?);
    }
    let mut kwargs = Vec::with_capacity(call.kwargs.len());
    for (key, arg) in &call.kwargs {
        kwargs.push((key.clone(), resolve_arg(arg)?));
    }
    Ok(ResolvedCall {
        name: call.name.clone(),
        args,
        kwargs,
        line: call.line,
        column: call.column,
    })
}

/// Apply a full pipeline to a value, left to right.
pub fn apply_pipeline(input: Value, calls: &[ResolvedCall]) -> Result<Value, Diagnostic> {
    if calls.len() > limits::MAX_PIPELINE_LENGTH {
        let first = &calls[0];
        return Err(Diagnostic::new(
            ErrorCode::F805,
            format!(
                "pipeline has {} lenses; the maximum is {}",
                calls.len(),
                limits::MAX_PIPELINE_LENGTH
            ),
            first.line,
            first.column,
        ));
    }
    let mut value = input;
    for call in calls {
        value = apply_one(value, call)?;
    }
    Ok(value)
}

fn apply_one(input: Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    let spec = lookup(&call.name).ok_or_else(|| {
        Diagnostic::new(
            ErrorCode::F802,
            format!("unknown lens '{}'", call.name),
            call.line,
            call.column,
        )
    })?;
    let matches_input = match spec.input {
        InputKind::Str => matches!(input, Value::String(_)),
        InputKind::Array => matches!(input, Value::Array(_)),
    };
    if !matches_input {
        return Err(Diagnostic::new(
            ErrorCode::F102,
            format!(
                "lens '{}' expects {}, found {}",
                call.name,
                match spec.input {
                    InputKind::Str => "a string",
                    InputKind::Array => "an array",
                },
                kind_name(&input)
            ),
            call.line,
            call.column,
        ));
    }
    (spec.run)(&input, call)
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str) -> ResolvedCall {
        ResolvedCall {
            name: name.to_string(),
            args: Vec::new(),
            kwargs: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn test_unknown_lens_is_f802() {
        let err = apply_pipeline(json!("x"), &[call("frobnicate")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::F802);
    }

    #[test]
    fn test_input_mismatch_is_f102() {
        let err = apply_pipeline(json!(42), &[call("trim")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::F102);
        let err = apply_pipeline(json!("s"), &[call("shuffle")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::F102);
    }

    #[test]
    fn test_pipeline_length_ceiling_is_f805() {
        let calls: Vec<ResolvedCall> = (0..limits::MAX_PIPELINE_LENGTH + 1)
            .map(|_| call("trim"))
            .collect();
        let err = apply_pipeline(json!("x"), &calls).unwrap_err();
        assert_eq!(err.code, ErrorCode::F805);
    }

    #[test]
    fn test_chained_application_order() {
        let calls = vec![call("dedent"), call("trim")];
        let input = json!("  line1\n    line2  \n");
        let out = apply_pipeline(input, &calls).unwrap();
        assert_eq!(out, json!("line1\n  line2"));
    }

    #[test]
    fn test_registry_has_all_required_lenses() {
        for name in [
            "trim",
            "dedent",
            "squeeze_spaces",
            "limit",
            "normalize_newlines",
            "lower",
            "upper",
            "replace",
            "regex_replace",
            "choose",
            "shuffle",
            "json_minify",
            "strip_markdown",
        ] {
            assert!(lookup(name).is_some(), "missing lens {}", name);
        }
    }
}
