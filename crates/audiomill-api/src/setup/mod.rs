//! Application bootstrap: database, services, routes, workers.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use audiomill_core::Config;
use axum::Router;
use std::sync::Arc;

pub use services::WorkerHandles;

/// Initialize the full application: connect and migrate the database, build
/// the service graph, spawn the configured workers, and assemble the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router, WorkerHandles)> {
    let pool = database::connect_and_migrate(&config).await?;

    let state = services::build_state(config.clone(), pool).await?;
    let workers = services::spawn_workers(&state, &config);
    let router = routes::build_router(state.clone());

    Ok((state, router, workers))
}
