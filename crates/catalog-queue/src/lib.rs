//! Catalog job queue core.
//!
//! This crate provides:
//! - The [`JobStore`] contract with PostgreSQL and in-memory backends
//! - The [`SubjectCatalog`] collaborator that resolves subjects and
//!   mirrors job outcomes onto them
//! - [`JobManager`], which composes both into the operations the
//!   Manager API exposes
//! - The [`Enqueuer`], the [`StaleJobReaper`], and the cron-driven
//!   [`CatalogScheduler`]

pub mod enqueuer;
pub mod manager;
pub mod reaper;
pub mod scheduler;
pub mod store;
pub mod subject;

pub use enqueuer::{Enqueuer, ScanReport};
pub use manager::{EXPIRED_REASON, JobManager};
pub use reaper::StaleJobReaper;
pub use scheduler::CatalogScheduler;
pub use store::{JobStore, MemoryJobStore};
pub use subject::{MemorySubjectCatalog, ResolveError, SubjectCatalog};
