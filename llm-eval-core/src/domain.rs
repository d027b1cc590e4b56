pub mod ids;
pub mod config;
pub mod job;
pub mod report;

pub use ids::*;
pub use config::*;
pub use job::*;
pub use report::*;
