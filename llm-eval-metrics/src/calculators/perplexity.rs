/// Perplexity over a token sequence: `exp(-mean(log_probs))`.
///
/// An empty sequence has perplexity 1.
pub fn perplexity(log_probs: &[f64]) -> f64 {
    if log_probs.is_empty() {
        return 1.0;
    }
    cross_entropy(log_probs).exp()
}

/// Mean log-probability, negated to give per-token cross-entropy in nats.
fn cross_entropy(log_probs: &[f64]) -> f64 {
    -log_probs.iter().sum::<f64>() / log_probs.len() as f64
}
