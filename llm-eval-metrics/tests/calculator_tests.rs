use approx::assert_relative_eq;
use llm_eval_metrics::*;
use proptest::prelude::*;
use rstest::rstest;

// ===== entropy Tests =====

#[test]
fn test_entropy_empty_is_zero() {
    assert_eq!(entropy(&[]), 0.0);
}

#[test]
fn test_entropy_single_certain_token() {
    assert_relative_eq!(entropy(&[0.0]), 0.0);
}

#[test]
fn test_entropy_uniform_distribution() {
    let lp = (0.25f64).ln();
    assert_relative_eq!(entropy(&[lp, lp, lp, lp]), (4.0f64).ln(), epsilon = 1e-12);
}

#[test]
fn test_entropy_renormalizes_truncated_distribution() {
    // Two equal alternatives that only cover 20% of the mass still read as a fair coin.
    let lp = (0.1f64).ln();
    assert_relative_eq!(entropy(&[lp, lp]), (2.0f64).ln(), epsilon = 1e-12);
}

#[test]
fn test_entropy_all_underflow_is_zero() {
    assert_eq!(entropy(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), 0.0);
}

// ===== token_entropy Tests =====

#[test]
fn test_token_entropy_uses_alternatives_when_present() {
    let lp = (0.5f64).ln();
    let alternatives = [lp, lp];
    assert_relative_eq!(
        token_entropy(-3.0, Some(&alternatives)),
        (2.0f64).ln(),
        epsilon = 1e-12
    );
}

#[test]
fn test_token_entropy_empty_alternatives_falls_back() {
    let lp = -0.5f64;
    assert_relative_eq!(token_entropy(lp, Some(&[])), -lp * lp.exp());
}

#[rstest]
#[case(-0.1)]
#[case(-1.0)]
#[case(-2.5)]
fn test_token_entropy_heuristic(#[case] lp: f64) {
    assert_relative_eq!(token_entropy(lp, None), -lp * lp.exp(), epsilon = 1e-12);
}

#[test]
fn test_token_entropy_certain_token_is_zero() {
    assert_eq!(token_entropy(0.0, None), 0.0);
    assert_eq!(token_entropy(0.5, None), 0.0);
}

#[test]
fn test_token_entropy_impossible_token_is_infinite() {
    assert_eq!(token_entropy(f64::NEG_INFINITY, None), f64::INFINITY);
}

// ===== perplexity Tests =====

#[test]
fn test_perplexity_empty_is_one() {
    assert_eq!(perplexity(&[]), 1.0);
}

#[rstest]
#[case(-0.1)]
#[case(-0.693)]
#[case(-4.0)]
fn test_perplexity_single_value(#[case] lp: f64) {
    assert_relative_eq!(perplexity(&[lp]), (-lp).exp(), epsilon = 1e-12);
}

#[test]
fn test_perplexity_is_exp_of_negative_mean() {
    let log_probs = [-0.5, -1.5, -1.0];
    assert_relative_eq!(perplexity(&log_probs), (1.0f64).exp(), epsilon = 1e-12);
}

#[test]
fn test_perplexity_of_certain_sequence_is_one() {
    assert_relative_eq!(perplexity(&[0.0, 0.0, 0.0]), 1.0);
}

// ===== burstiness Tests =====

#[rstest]
#[case("")]
#[case("   ")]
#[case("Just one sentence here.")]
#[case("no terminator at all")]
fn test_burstiness_fewer_than_two_sentences(#[case] text: &str) {
    assert_eq!(burstiness(text), 0.0);
}

#[test]
fn test_burstiness_equal_sentences_is_zero() {
    assert_relative_eq!(burstiness("One two three. Four five six. Seven eight nine."), 0.0);
}

#[test]
fn test_burstiness_coefficient_of_variation() {
    // word counts 1 and 3: mean 2, population std dev 1
    assert_relative_eq!(burstiness("Hi. How are you?"), 0.5, epsilon = 1e-12);
}

#[test]
fn test_split_sentences_handles_runs_and_closers() {
    let sentences = split_sentences("Really?! Yes. \"Quoted.\" Then (aside.) done");
    assert_eq!(
        sentences,
        vec!["Really?!", "Yes.", "\"Quoted.\"", "Then (aside.)", "done"]
    );
}

#[test]
fn test_split_sentences_ignores_inline_periods() {
    let sentences = split_sentences("Version 1.2 shipped. It works.");
    assert_eq!(sentences, vec!["Version 1.2 shipped.", "It works."]);
}

// ===== LatencySummary Tests =====

#[test]
fn test_latency_summary_empty() {
    let summary = LatencySummary::from_measurements(&[]);
    assert_eq!(summary.mean, 0.0);
    assert_eq!(summary.min, 0.0);
    assert_eq!(summary.max, 0.0);
    assert_eq!(summary.count, 0);
}

#[test]
fn test_latency_summary_values() {
    let summary = LatencySummary::from_measurements(&[30.0, 10.0, 20.0]);
    assert_eq!(summary.min, 10.0);
    assert_eq!(summary.max, 30.0);
    assert_relative_eq!(summary.mean, 20.0);
    assert_eq!(summary.count, 3);
}

// ===== Properties =====

proptest! {
    #[test]
    fn prop_entropy_is_bounded_by_log_n(log_probs in prop::collection::vec(-20.0f64..0.0, 1..16)) {
        let h = entropy(&log_probs);
        prop_assert!(h >= -1e-12);
        prop_assert!(h <= (log_probs.len() as f64).ln() + 1e-9);
    }

    #[test]
    fn prop_perplexity_of_log_probs_is_at_least_one(log_probs in prop::collection::vec(-20.0f64..=0.0, 1..32)) {
        prop_assert!(perplexity(&log_probs) >= 1.0 - 1e-12);
    }

    #[test]
    fn prop_burstiness_is_non_negative(words in prop::collection::vec(1usize..12, 0..8)) {
        let text: String = words
            .iter()
            .map(|&n| format!("{}.", vec!["word"; n].join(" ")))
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert!(burstiness(&text) >= 0.0);
    }
}
