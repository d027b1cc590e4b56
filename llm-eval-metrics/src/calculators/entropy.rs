/// Shannon entropy (nats) of the distribution described by `log_probs`.
///
/// The probabilities `exp(lp)` are renormalized to sum to one first, so a
/// truncated top-k list is treated as the whole distribution.
pub fn entropy(log_probs: &[f64]) -> f64 {
    if log_probs.is_empty() {
        return 0.0;
    }

    let probs: Vec<f64> = log_probs.iter().map(|lp| lp.exp()).collect();
    let total: f64 = probs.iter().sum();
    if total == 0.0 {
        return 0.0;
    }

    probs
        .iter()
        .map(|p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Entropy estimate for one generated token.
///
/// With the alternatives' log-probabilities available this is [`entropy`] over
/// them. Otherwise it falls back to `-lp * exp(lp)` on the chosen token alone.
/// That fallback is a confidence proxy rather than a Shannon entropy; stored
/// telemetry depends on it, so it stays as is.
pub fn token_entropy(log_prob: f64, alternatives: Option<&[f64]>) -> f64 {
    if let Some(alternatives) = alternatives.filter(|alts| !alts.is_empty()) {
        return entropy(alternatives);
    }

    let prob = log_prob.exp();
    if prob >= 1.0 {
        return 0.0;
    }
    if prob <= 0.0 {
        return f64::INFINITY;
    }
    -log_prob * prob
}
