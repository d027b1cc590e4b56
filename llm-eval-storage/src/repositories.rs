pub mod job;

pub use job::PgJobStore;
