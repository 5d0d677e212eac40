//! Repository implementations for catalog jobs and assets.

pub mod asset;
pub mod job;

pub use asset::AssetRepository;
pub use job::JobRepository;
