//! # catalog-database
//!
//! PostgreSQL connection management, embedded migrations, and the
//! repositories backing the catalog job queue.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{AssetRepository, JobRepository};
