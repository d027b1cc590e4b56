pub mod memory;
pub mod postgres;
pub mod repositories;

pub use memory::InMemoryJobStore;
pub use postgres::{connect, create_pool, migrate, PostgresConfig};
pub use repositories::*;
