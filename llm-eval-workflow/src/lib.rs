//! Batch evaluation engine.
//!
//! [`JobRunner`] moves a job through `Pending -> Processing -> {Completed, Failed}`,
//! streaming each item through the inference client, checking the output with
//! the configured validators and checkpointing after every item. Dispatchers
//! pick where a run happens; [`EvaluationService`] is the caller-facing API.

pub mod dispatcher;
pub mod error;
pub mod runner;
pub mod service;
pub mod validators;

pub use dispatcher::{run_worker, InlineDispatcher, QueuedDispatcher, WorkerReport};
pub use error::{ItemError, JobFatalError};
pub use runner::{ClientFactory, ConfiguredClientFactory, JobRunner, RunOutcome};
pub use service::EvaluationService;
pub use validators::{check_length, check_structured, run_validators, ValidationOutcome};
