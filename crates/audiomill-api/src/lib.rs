//! Audiomill API library
//!
//! Gateway surface of the pipeline: authenticates callers, accepts uploads
//! onto the queue, and streams finished artifacts back. Exposed as a library
//! so integration tests can assemble the router over test backends.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
