//! Per-model record of the probability-detail capability.

use dashmap::DashSet;

/// Models known not to accept the probability-detail option.
pub const DEFAULT_UNSUPPORTED_MODELS: &[&str] = &[
    "llama-3.1-8b-instant",
    "llama-3.2-1b-preview",
    "llama-3.2-3b-preview",
];

/// Shared negative set of models that reject probability detail.
///
/// One registry is shared (behind an `Arc`) by every client in the process, so
/// a fallback learned by one job applies to all later calls. Membership is
/// only ever added to, except through [`CapabilityRegistry::reset`].
#[derive(Debug)]
pub struct CapabilityRegistry {
    unsupported: DashSet<String>,
    seed: Vec<String>,
}

impl CapabilityRegistry {
    /// Registry seeded with [`DEFAULT_UNSUPPORTED_MODELS`].
    pub fn new() -> Self {
        Self::with_unsupported(DEFAULT_UNSUPPORTED_MODELS.iter().copied())
    }

    /// Registry with no known-bad models.
    pub fn empty() -> Self {
        Self::with_unsupported(std::iter::empty::<&str>())
    }

    pub fn with_unsupported<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seed: Vec<String> = models.into_iter().map(Into::into).collect();
        let unsupported = seed.iter().cloned().collect();
        Self { unsupported, seed }
    }

    pub fn supports_probability_detail(&self, model: &str) -> bool {
        !self.unsupported.contains(model)
    }

    /// Returns true if the model was not already marked.
    pub fn mark_unsupported(&self, model: &str) -> bool {
        self.unsupported.insert(model.to_string())
    }

    /// Restores the seeded state. Seeded models stay marked throughout, so a
    /// concurrent reader never sees one of them as supported.
    pub fn reset(&self) {
        for model in &self.seed {
            self.unsupported.insert(model.clone());
        }
        self.unsupported.retain(|model| self.seed.contains(model));
    }

    /// Sorted snapshot of the negative set.
    pub fn unsupported_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.unsupported.iter().map(|m| m.key().clone()).collect();
        models.sort();
        models
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
