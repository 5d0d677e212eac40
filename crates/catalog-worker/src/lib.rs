//! Catalog worker.
//!
//! This crate provides:
//! - [`ManagerApi`] clients: HTTP for remote workers and in-process for a
//!   worker embedded in the manager
//! - A [`WorkerRunner`] that claims jobs up to a concurrency limit and
//!   keeps each one alive with heartbeats
//! - A [`JobExecutor`] that runs the media tools for a job's kind

pub mod client;
pub mod executor;
pub mod heartbeat;
pub mod identity;
pub mod runner;
pub mod tools;

pub use client::{HttpManagerClient, LocalManagerClient, ManagerApi};
pub use executor::{JobExecutionError, JobExecutor, ProgressSink};
pub use identity::resolve_worker_id;
pub use runner::WorkerRunner;
