//! Seeded, reproducible selection and permutation.
//!
//! `choose` and `shuffle` are deterministic across implementations: the same
//! inputs with the same integer seed produce identical outputs bit for bit.
//! The random stream is splitmix64 with the published constants, and the
//! permutation is a Fisher–Yates walk from the high index down.

use serde_json::Value;

use crate::diagnostics::Diagnostic;

use super::ResolvedCall;

/// Advance the splitmix64 state and return the next value in the stream.
pub(crate) fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic selection: the element at `seed mod length`.
pub(super) fn run_choose(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(1, &["seed"])?;
    let seed = call.seed()?;
    let items = input.as_array().expect("input kind checked by the runtime");
    if items.is_empty() {
        return Err(call.arg_error("cannot choose from an empty array"));
    }
    let index = seed.rem_euclid(items.len() as i64) as usize;
    Ok(items[index].clone())
}

/// Deterministic permutation: Fisher–Yates driven by splitmix64.
pub(super) fn run_shuffle(input: &Value, call: &ResolvedCall) -> Result<Value, Diagnostic> {
    call.expect_arity(1, &["seed"])?;
    let seed = call.seed()?;
    let mut items = input
        .as_array()
        .expect("input kind checked by the runtime")
        .clone();
    let mut state = seed as u64;
    for i in (1..items.len()).rev() {
        let j = (splitmix64(&mut state) % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::super::{apply_pipeline, ResolvedCall};
    use super::*;
    use serde_json::json;

    fn seeded(name: &str, seed: i64) -> ResolvedCall {
        ResolvedCall {
            name: name.to_string(),
            args: Vec::new(),
            kwargs: vec![("seed".to_string(), json!(seed))],
            line: 1,
            column: 1,
        }
    }

    fn bare(name: &str) -> ResolvedCall {
        ResolvedCall {
            name: name.to_string(),
            args: Vec::new(),
            kwargs: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn test_splitmix64_reference_stream() {
        // First outputs for seed 0, from the published splitmix64.
        let mut state = 0u64;
        assert_eq!(splitmix64(&mut state), 0xE220_A839_7B1D_CDAF);
        assert_eq!(splitmix64(&mut state), 0x6E78_9E6A_A1B9_65F4);
        assert_eq!(splitmix64(&mut state), 0x06C4_5D18_8009_454F);
    }

    #[test]
    fn test_choose_is_seed_mod_length() {
        let input = json!(["Hi", "Hello", "Hey"]);
        let out = apply_pipeline(input.clone(), &[seeded("choose", 42)]).unwrap();
        assert_eq!(out, json!("Hi")); // 42 mod 3 == 0
        let out = apply_pipeline(input.clone(), &[seeded("choose", 43)]).unwrap();
        assert_eq!(out, json!("Hello"));
        let out = apply_pipeline(input, &[seeded("choose", -1)]).unwrap();
        assert_eq!(out, json!("Hey")); // rem_euclid keeps the index in range
    }

    #[test]
    fn test_choose_missing_seed_is_f804() {
        let err = apply_pipeline(json!(["a"]), &[bare("choose")]).unwrap_err();
        assert_eq!(err.code, crate::diagnostics::ErrorCode::F804);
    }

    #[test]
    fn test_choose_empty_array_is_f801() {
        let err = apply_pipeline(json!([]), &[seeded("choose", 1)]).unwrap_err();
        assert_eq!(err.code, crate::diagnostics::ErrorCode::F801);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let input = json!([1, 2, 3, 4, 5, 6, 7]);
        let out = apply_pipeline(input.clone(), &[seeded("shuffle", 9)]).unwrap();
        let mut sorted: Vec<i64> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let input = json!(["a", "b", "c", "d"]);
        let once = apply_pipeline(input.clone(), &[seeded("shuffle", 7)]).unwrap();
        let again = apply_pipeline(input, &[seeded("shuffle", 7)]).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn test_shuffle_small_inputs_are_stable() {
        assert_eq!(
            apply_pipeline(json!([]), &[seeded("shuffle", 3)]).unwrap(),
            json!([])
        );
        assert_eq!(
            apply_pipeline(json!([1]), &[seeded("shuffle", 3)]).unwrap(),
            json!([1])
        );
    }
}
