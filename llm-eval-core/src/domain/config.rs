use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_LENGTH_TOLERANCE: f64 = 0.2;

// ===== Generation Parameters =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct GenerationParams {
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[validate(range(min = 1, max = 8192))]
    pub max_tokens: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
        }
    }
}

// ===== Validator Configuration =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StructuredFormat {
    #[default]
    Json,
}

/// One configured per-item check. Evaluated in list order; the first failure
/// short-circuits the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorSpec {
    StructuredOutput {
        #[serde(default)]
        format: StructuredFormat,
    },
    LengthTolerance {
        expected_length: usize,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
}

fn default_tolerance() -> f64 {
    DEFAULT_LENGTH_TOLERANCE
}

impl ValidatorSpec {
    pub fn json() -> Self {
        ValidatorSpec::StructuredOutput {
            format: StructuredFormat::Json,
        }
    }

    pub fn length(expected_length: usize) -> Self {
        ValidatorSpec::LengthTolerance {
            expected_length,
            tolerance: DEFAULT_LENGTH_TOLERANCE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ValidatorSpec::StructuredOutput { .. } => "structured_output",
            ValidatorSpec::LengthTolerance { .. } => "length_tolerance",
        }
    }
}

// ===== Metric Configuration =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricConfig {
    #[serde(default)]
    pub validators: Vec<ValidatorSpec>,
}

impl MetricConfig {
    pub fn new(validators: Vec<ValidatorSpec>) -> Self {
        Self { validators }
    }

    /// Builds the validator list from the flag-style options
    /// (`check_json`, `check_length`). The structured check always runs first.
    pub fn from_flags(check_json: bool, check_length: Option<usize>) -> Self {
        let mut validators = Vec::new();
        if check_json {
            validators.push(ValidatorSpec::json());
        }
        if let Some(expected) = check_length {
            validators.push(ValidatorSpec::length(expected));
        }
        Self { validators }
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
