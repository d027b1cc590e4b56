//! Command implementations

pub mod jobs;
pub mod models;
pub mod playground;
pub mod run;
