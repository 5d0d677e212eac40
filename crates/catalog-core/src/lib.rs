//! # catalog-core
//!
//! Core crate for the catalog job queue. Contains configuration schemas
//! and the unified error system shared by the manager, the workers, and
//! the CLI.
//!
//! This crate has **no** internal dependencies on other catalog crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
