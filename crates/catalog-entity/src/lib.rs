//! # catalog-entity
//!
//! Domain entity models for the catalog job queue. Every struct in this
//! crate represents a database table row or a value exchanged between the
//! manager and its workers. Database entities derive `sqlx::FromRow`.

pub mod job;
pub mod subject;
