//! Per-item output checks.

use llm_eval_core::{StructuredFormat, ValidatorSpec};

use crate::error::ItemError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Passed,
    Failed(String),
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ValidationOutcome::Passed)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Passed => None,
            ValidationOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Runs the checks in order and stops at the first failure. No checks means
/// the output passes.
pub fn run_validators(specs: &[ValidatorSpec], output: &str) -> Result<ValidationOutcome, ItemError> {
    for spec in specs {
        let outcome = match spec {
            ValidatorSpec::StructuredOutput { format } => check_structured(*format, output),
            ValidatorSpec::LengthTolerance {
                expected_length,
                tolerance,
            } => check_length(output, *expected_length, *tolerance)?,
        };
        if !outcome.passed() {
            return Ok(outcome);
        }
    }
    Ok(ValidationOutcome::Passed)
}

pub fn check_structured(format: StructuredFormat, output: &str) -> ValidationOutcome {
    match format {
        StructuredFormat::Json => match serde_json::from_str::<serde_json::Value>(output) {
            Ok(_) => ValidationOutcome::Passed,
            Err(e) => ValidationOutcome::Failed(format!("Invalid JSON: {}", e)),
        },
    }
}

/// Length is counted in characters. Bounds are truncated to whole characters.
pub fn check_length(
    output: &str,
    expected_length: usize,
    tolerance: f64,
) -> Result<ValidationOutcome, ItemError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ItemError::Validator(format!(
            "length tolerance must be a non-negative number, got {}",
            tolerance
        )));
    }

    let expected = expected_length as f64;
    let min = (expected * (1.0 - tolerance)).max(0.0) as usize;
    let max = (expected * (1.0 + tolerance)) as usize;
    let actual = output.chars().count();

    if (min..=max).contains(&actual) {
        Ok(ValidationOutcome::Passed)
    } else {
        Ok(ValidationOutcome::Failed(format!(
            "Length {} not within {}-{}",
            actual, min, max
        )))
    }
}
