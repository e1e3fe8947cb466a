pub mod in_memory;
pub mod postgres;
pub mod repositories;
pub mod repository_ports;

pub use in_memory::InMemoryStore;
pub use postgres::{PoolStats, PostgresDatabase};
