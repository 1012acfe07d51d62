//! End-to-end canonicalization scenarios.
//!
//! Each test drives the full pipeline through the public `canonize` entry
//! point and checks the canonical JSON value, including key order where it
//! matters.

use facet::{canonize, emit, CanonizeOptions, ErrorCode, ResolveMode};
use serde_json::json;

fn canon(src: &str) -> serde_json::Value {
    canonize(src.as_bytes(), &CanonizeOptions::default()).unwrap()
}

fn canon_err(src: &str) -> Vec<facet::Diagnostic> {
    canonize(src.as_bytes(), &CanonizeOptions::default()).unwrap_err()
}

#[test]
fn canonical_mapping_without_lenses() {
    let out = canon("@user(name=\"Alex\")\n  message: \"Hello, world!\"\n");
    assert_eq!(
        emit::to_string(&out),
        "{\"user\":{\"_attrs\":{\"name\":\"Alex\"},\"message\":\"Hello, world!\"}}"
    );
}

#[test]
fn dedent_and_trim_on_multiline_string() {
    let src = "@doc\n  text: \"\"\"  line1\n    line2  \n\"\"\" |> dedent |> trim\n";
    let out = canon(src);
    assert_eq!(out["doc"]["text"], json!("line1\n  line2"));
}

#[test]
fn anchor_reuse_duplicates_the_literal() {
    let out = canon("@system\n  style &s: \"friendly\"\n  copy: *s\n");
    assert_eq!(out["system"]["style"], json!("friendly"));
    assert_eq!(out["system"]["copy"], json!("friendly"));
}

#[test]
fn seeded_choice_is_deterministic() {
    let src = concat!(
        "@vars\n  greetings: [\"Hi\", \"Hello\", \"Hey\"]\n  seed: 42\n",
        "@out\n  greeting: \"{{ greetings |> choose(seed=$seed) }}\"\n",
    );
    let options = CanonizeOptions {
        resolve_mode: ResolveMode::All,
        ..CanonizeOptions::default()
    };
    let out = canonize(src.as_bytes(), &options).unwrap();
    assert_eq!(out["out"]["greeting"], json!("Hi")); // 42 mod 3 == 0
}

#[test]
fn conditional_pruning_removes_whole_facet() {
    let src = concat!(
        "@vars\n  mode: \"user\"\n",
        "@system(if=\"mode == 'expert'\")\n  role: \"expert\"\n",
        "@user\n  msg: \"hi\"\n",
    );
    let out = canon(src);
    assert_eq!(out, json!({"user": {"_attrs": {}, "msg": "hi"}}));
}

#[test]
fn merge_import_combines_facets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.fct"),
        "@system\n  style: \"concise\"\n",
    )
    .unwrap();
    let src = "@import \"base.fct\"\n@system\n  tone: \"warm\"\n";
    let options = CanonizeOptions {
        import_roots: vec![dir.path().to_path_buf()],
        ..CanonizeOptions::default()
    };
    let out = canonize(src.as_bytes(), &options).unwrap();
    assert_eq!(
        emit::to_string(&out),
        "{\"system\":{\"_attrs\":{},\"style\":\"concise\",\"tone\":\"warm\"}}"
    );
}

#[test]
fn host_mode_sees_only_host_vars() {
    let src = "@vars\n  who: \"document\"\n@out\n  v: $who\n";
    let options = CanonizeOptions {
        resolve_mode: ResolveMode::Host,
        host_vars: json!({"who": "host"}).as_object().unwrap().clone(),
        ..CanonizeOptions::default()
    };
    let out = canonize(src.as_bytes(), &options).unwrap();
    assert_eq!(out["out"]["v"], json!("host"));
}

#[test]
fn list_facet_renders_under_items() {
    let out = canon("@plan\n  - \"read\"\n  - \"write\"\n");
    assert_eq!(
        out,
        json!({"plan": {"_attrs": {}, "items": ["read", "write"]}})
    );
}

#[test]
fn nested_structures_round_out() {
    let src = concat!(
        "@config\n",
        "  server:\n",
        "    host: \"localhost\"\n",
        "    ports: [80, 443]\n",
        "  flags:\n",
        "    - \"fast\"\n",
        "    - \"safe\"\n",
    );
    let out = canon(src);
    assert_eq!(
        out["config"],
        json!({
            "_attrs": {},
            "server": {"host": "localhost", "ports": [80, 443]},
            "flags": ["fast", "safe"]
        })
    );
}

#[test]
fn output_key_order_is_source_order() {
    let src = "@b\n  two: 2\n@a\n  one: 1\n";
    let out = canon(src);
    let names: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["b", "a"]);
    let keys: Vec<&String> = out["b"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["_attrs", "two"]);
}

#[test]
fn compile_time_facets_never_reach_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("extra.fct"), "@extra\n  k: 1\n").unwrap();
    let src = concat!(
        "@import \"extra.fct\"\n",
        "@vars\n  x: 1\n",
        "@var_types\n  x: {type: \"int\"}\n",
        "@main\n  v: $x\n",
    );
    let options = CanonizeOptions {
        import_roots: vec![dir.path().to_path_buf()],
        ..CanonizeOptions::default()
    };
    let out = canonize(src.as_bytes(), &options).unwrap();
    let names: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["extra", "main"]);
}

#[test]
fn determinism_across_repeated_runs() {
    let src = concat!(
        "@vars\n  seed: 9\n  xs: [1, 2, 3, 4, 5]\n",
        "@out\n  shuffled: $xs |> shuffle(seed=9)\n",
        "  note: \"{{ xs |> choose(seed=$seed) }}\"\n",
    );
    let first = emit::to_string(&canon(src));
    for _ in 0..5 {
        assert_eq!(emit::to_string(&canon(src)), first);
    }
}

#[test]
fn shuffle_emits_a_permutation() {
    let out = canon("@out\n  xs: [1, 2, 3, 4, 5] |> shuffle(seed=3)\n");
    let mut values: Vec<i64> = out["out"]["xs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[test]
fn tab_in_indentation_fails_with_f002_and_no_output() {
    let err = canon_err("@a\n\tk: 1\n");
    assert_eq!(err[0].code, ErrorCode::F002);
}

#[test]
fn alias_without_definition_is_f201() {
    let err = canon_err("@a\n  v: *ghost\n");
    assert_eq!(err[0].code, ErrorCode::F201);
}

#[test]
fn anchor_redefinition_is_f202() {
    let err = canon_err("@a\n  x &l: 1\n  y &l: 2\n");
    assert_eq!(err[0].code, ErrorCode::F202);
}

#[test]
fn variable_typing_gate_runs_before_substitution() {
    let src = concat!(
        "@vars\n  retries: \"three\"\n",
        "@var_types\n  retries: {type: \"int\", min: 0, max: 5}\n",
        "@out\n  r: $retries\n",
    );
    let err = canon_err(src);
    assert_eq!(err[0].code, ErrorCode::F451);
}

#[test]
fn fence_content_is_verbatim() {
    let src = concat!(
        "@prompt\n",
        "  template:\n",
        "    ```jinja\n",
        "    {{ this_is_not_interpolated }}\n",
        "    ```\n",
    );
    let out = canon(src);
    assert_eq!(
        out["prompt"]["template"],
        json!("{{ this_is_not_interpolated }}\n")
    );
}

#[test]
fn fence_pipeline_minifies_json() {
    let src = concat!(
        "@prompt\n",
        "  schema:\n",
        "    ```json\n",
        "    { \"a\" : 1 }\n",
        "    ``` |> json_minify |> trim\n",
    );
    let out = canon(src);
    assert_eq!(out["prompt"]["schema"], json!("{\"a\":1}"));
}

#[test]
fn interpolation_misses_are_f402a() {
    let err = canon_err("@out\n  v: \"{{ ghost }}\"\n");
    assert_eq!(err[0].code, ErrorCode::F402A);
}

#[test]
fn substitution_misses_are_f404() {
    let err = canon_err("@out\n  v: $ghost\n");
    assert_eq!(err[0].code, ErrorCode::F404);
}

#[test]
fn diagnostics_carry_positions_and_snippets() {
    let src = "@a\n  v: *ghost\n";
    let err = canon_err(src);
    assert_eq!(err[0].line, 2);
    let snippet = err[0].render_snippet(src).unwrap();
    assert!(snippet.contains("*ghost"));
    assert!(snippet.contains('^'));
}

#[test]
fn crlf_and_bom_sources_normalize() {
    let src = "\u{feff}@user\r\n  msg: \"hi\"\r\n";
    let out = canon(src);
    assert_eq!(out["user"]["msg"], json!("hi"));
}

#[test]
fn snapshot_of_canonical_emission() {
    let out = canon("@user(name=\"Alex\")\n  message: \"Hello\"\n");
    insta::assert_snapshot!(
        emit::to_string(&out),
        @r#"{"user":{"_attrs":{"name":"Alex"},"message":"Hello"}}"#
    );
}

#[test]
fn numbers_render_canonically() {
    let out = canon("@n\n  i: 42\n  f: 2.5\n  z: 0\n  neg: -7\n");
    assert_eq!(
        emit::to_string(&out["n"]),
        "{\"_attrs\":{},\"i\":42,\"f\":2.5,\"z\":0,\"neg\":-7}"
    );
}
