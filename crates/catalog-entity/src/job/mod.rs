//! Catalog job domain entities.

pub mod claim;
pub mod model;
pub mod result;
pub mod status;

pub use claim::{ExecutionContext, WorkerClaim};
pub use model::{CreateJob, Job, QueueDepth};
pub use result::{JobResult, MediaMetadata, ProxyArtifacts};
pub use status::{JobKind, JobStatus};
