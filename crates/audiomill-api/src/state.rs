//! Application state.
//!
//! Every component receives its collaborators explicitly through this state.
//! There are no process-wide connection singletons, so tests can swap in
//! in-memory doubles for the store, queue, and credential lookup.

use audiomill_auth::TokenService;
use audiomill_core::Config;
use audiomill_queue::JobQueue;
use audiomill_storage::BlobStore;
use std::sync::Arc;

use crate::services::IngressService;

/// Main application state, shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub token_service: Arc<TokenService>,
    pub source_store: Arc<dyn BlobStore>,
    pub product_store: Arc<dyn BlobStore>,
    pub queue: Arc<dyn JobQueue>,
    pub ingress: IngressService,
    pub is_production: bool,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
