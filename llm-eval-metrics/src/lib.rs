//! Token-level and job-level quality metrics.
//!
//! Everything here is a pure function of its input.

pub mod calculators;
pub mod aggregators;

pub use calculators::*;
pub use aggregators::*;
