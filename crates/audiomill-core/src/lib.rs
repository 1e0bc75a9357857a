//! Audiomill core library
//!
//! Shared domain models, error types, configuration, and constants used by
//! every other audiomill crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{BlobId, Job, JobStage};
