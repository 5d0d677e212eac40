//! Catalog subjects: assets stored on volumes.

pub mod asset;
pub mod status;

pub use asset::{Asset, EligibleSubject};
pub use status::SubjectStatus;
