use llm_eval_core::{MetricConfig, StructuredFormat, ValidatorSpec};
use llm_eval_workflow::{check_length, check_structured, run_validators, ItemError, ValidationOutcome};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

#[test]
fn test_no_validators_always_pass() {
    assert_eq!(run_validators(&[], "anything").unwrap(), ValidationOutcome::Passed);
    assert_eq!(run_validators(&[], "").unwrap(), ValidationOutcome::Passed);
}

#[rstest]
#[case(r#"{"a": 1}"#)]
#[case("[1, 2, 3]")]
#[case("42")]
#[case("  \"text\"  ")]
fn test_structured_check_accepts_json(#[case] output: &str) {
    assert!(check_structured(StructuredFormat::Json, output).passed());
}

#[rstest]
#[case("")]
#[case("{\"a\": }")]
#[case("Sure! Here is the JSON: {}")]
fn test_structured_check_rejects_malformed(#[case] output: &str) {
    let outcome = check_structured(StructuredFormat::Json, output);
    let reason = outcome.failure_reason().unwrap();
    assert!(reason.starts_with("Invalid JSON: "));
    assert!(reason.len() > "Invalid JSON: ".len());
}

#[rstest]
#[case(100, 80, true)]
#[case(100, 120, true)]
#[case(100, 79, false)]
#[case(100, 121, false)]
#[case(0, 0, true)]
#[case(0, 1, false)]
fn test_length_bounds_default_tolerance(
    #[case] expected: usize,
    #[case] actual: usize,
    #[case] passes: bool,
) {
    let output = "x".repeat(actual);
    let outcome = check_length(&output, expected, 0.2).unwrap();
    assert_eq!(outcome.passed(), passes);
}

#[test]
fn test_length_failure_states_range_and_actual() {
    let outcome = check_length("short", 50, 0.2).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Failed("Length 5 not within 40-60".to_string())
    );
}

#[test]
fn test_length_bounds_truncate() {
    // 7 * 0.8 = 5.6 and 7 * 1.2 = 8.4
    let outcome = check_length("abc", 7, 0.2).unwrap();
    assert_eq!(outcome.failure_reason(), Some("Length 3 not within 5-8"));
}

#[test]
fn test_length_counts_characters() {
    assert!(check_length("héllo", 5, 0.0).unwrap().passed());
}

#[rstest]
#[case(-0.1)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn test_invalid_tolerance_is_an_item_error(#[case] tolerance: f64) {
    let err = check_length("abc", 3, tolerance).unwrap_err();
    assert!(matches!(err, ItemError::Validator(_)));
}

#[test]
fn test_first_failure_short_circuits() {
    // Both checks would fail; only the structured message is reported.
    let config = MetricConfig::from_flags(true, Some(1000));
    let outcome = run_validators(&config.validators, "nope").unwrap();
    assert!(outcome.failure_reason().unwrap().starts_with("Invalid JSON"));

    let reversed = vec![ValidatorSpec::length(1000), ValidatorSpec::json()];
    let outcome = run_validators(&reversed, "nope").unwrap();
    assert!(outcome.failure_reason().unwrap().starts_with("Length 4"));
}

#[test]
fn test_later_check_runs_when_earlier_passes() {
    let config = MetricConfig::from_flags(true, Some(100));
    let outcome = run_validators(&config.validators, "{}").unwrap();
    assert_eq!(outcome.failure_reason(), Some("Length 2 not within 80-120"));
}

proptest! {
    #[test]
    fn prop_zero_tolerance_passes_only_exact_length(expected in 0usize..200, actual in 0usize..200) {
        let output = "a".repeat(actual);
        let outcome = check_length(&output, expected, 0.0).unwrap();
        prop_assert_eq!(outcome.passed(), expected == actual);
    }
}
