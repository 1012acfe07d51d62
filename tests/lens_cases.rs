//! Table-driven lens contract tests through the document surface.
//!
//! Each case canonicalizes a one-pair document whose value runs through the
//! lens under test, which exercises parsing, argument resolution, and the
//! runtime contract together.

use facet::{canonize, CanonizeOptions, ErrorCode};
use rstest::rstest;
use serde_json::json;

fn canon_value(value_src: &str) -> Result<serde_json::Value, Vec<facet::Diagnostic>> {
    let src = format!("@t\n  v: {}\n", value_src);
    canonize(src.as_bytes(), &CanonizeOptions::default()).map(|out| out["t"]["v"].clone())
}

#[rstest]
#[case::trim("\"  x  \" |> trim", json!("x"))]
#[case::lower("\"AbC\" |> lower", json!("abc"))]
#[case::upper("\"AbC\" |> upper", json!("ABC"))]
#[case::squeeze("\"a  \t b\" |> squeeze_spaces", json!("a b"))]
#[case::limit("\"hello world\" |> limit(5)", json!("hello"))]
#[case::limit_zero("\"abc\" |> limit(0)", json!(""))]
#[case::replace("\"aaa\" |> replace(\"aa\", \"b\")", json!("ba"))]
#[case::regex_replace(
    "\"user@host\" |> regex_replace(\"@.*\", \"@redacted\")",
    json!("user@redacted")
)]
#[case::minify("\"[1, 2]\" |> json_minify", json!("[1,2]"))]
#[case::minify_not_json("\"plain\" |> json_minify", json!("plain"))]
#[case::strip_md("\"**bold** text\" |> strip_markdown", json!("bold text"))]
#[case::choose("[\"a\", \"b\", \"c\"] |> choose(seed=4)", json!("b"))]
#[case::chained("\"  A b  \" |> trim |> lower", json!("a b"))]
fn lens_contracts(#[case] value_src: &str, #[case] expected: serde_json::Value) {
    assert_eq!(canon_value(value_src).unwrap(), expected);
}

#[rstest]
#[case::unknown("\"x\" |> nosuchlens", ErrorCode::F802)]
#[case::wrong_input("42 |> trim", ErrorCode::F102)]
#[case::array_into_string_lens("[1] |> trim", ErrorCode::F102)]
#[case::string_into_choose("\"x\" |> choose(seed=1)", ErrorCode::F102)]
#[case::missing_seed("[1, 2] |> choose", ErrorCode::F804)]
#[case::missing_seed_shuffle("[1, 2] |> shuffle", ErrorCode::F804)]
#[case::bad_seed_type("[1, 2] |> choose(seed=\"x\")", ErrorCode::F801)]
#[case::bad_limit("\"x\" |> limit(\"five\")", ErrorCode::F801)]
#[case::missing_limit("\"x\" |> limit", ErrorCode::F801)]
#[case::extra_args("\"x\" |> trim(1)", ErrorCode::F801)]
#[case::bad_regex("\"x\" |> regex_replace(\"(\", \"y\")", ErrorCode::F803)]
fn lens_errors(#[case] value_src: &str, #[case] expected: ErrorCode) {
    let err = canon_value(value_src).unwrap_err();
    assert_eq!(err[0].code, expected);
}

#[test]
fn pipeline_length_ceiling() {
    let chain = " |> trim".repeat(facet::limits::MAX_PIPELINE_LENGTH + 1);
    let err = canon_value(&format!("\"x\"{}", chain)).unwrap_err();
    assert_eq!(err[0].code, ErrorCode::F805);
}

#[test]
fn choose_accepts_negative_seed() {
    assert_eq!(
        canon_value("[\"a\", \"b\", \"c\"] |> choose(seed=-1)").unwrap(),
        json!("c")
    );
}

#[test]
fn shuffle_with_same_seed_is_stable() {
    let first = canon_value("[1, 2, 3, 4, 5, 6] |> shuffle(seed=11)").unwrap();
    let second = canon_value("[1, 2, 3, 4, 5, 6] |> shuffle(seed=11)").unwrap();
    assert_eq!(first, second);
}
