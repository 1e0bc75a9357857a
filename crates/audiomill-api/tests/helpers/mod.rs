//! Test helpers: build AppState and router for integration tests.
//!
//! The router runs over in-memory backends (credential store, blob stores,
//! queue), so the suite needs no database or broker. Run from the workspace
//! root: `cargo test -p audiomill-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use audiomill_auth::{MemoryCredentialStore, TokenService};
use audiomill_core::Config;
use audiomill_queue::{JobQueue, MemoryJobQueue};
use audiomill_storage::{BlobStore, MemoryBlobStore};
use audiomill_worker::codec::{Codec, CodecError};
use audiomill_worker::transport::{Transport, TransportError};
use audiomill_api::services::IngressService;
use audiomill_api::setup::routes::build_router;
use audiomill_api::state::AppState;
use axum_test::TestServer;
use std::sync::{Arc, Mutex};

pub const PRIVILEGED_USER: &str = "alice@example.com";
pub const PRIVILEGED_SECRET: &str = "wordpass";
pub const UNPRIVILEGED_USER: &str = "bob@example.com";
pub const UNPRIVILEGED_SECRET: &str = "hunter2";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", audiomill_core::constants::API_PREFIX, path)
}

/// Test application: server plus handles on the in-memory backends.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub queue: MemoryJobQueue,
    pub source_store: MemoryBlobStore,
    pub product_store: MemoryBlobStore,
    pub credentials: MemoryCredentialStore,
}

fn test_config() -> Config {
    std::env::set_var("DATABASE_URL", "postgresql://localhost/audiomill-test");
    std::env::set_var("JWT_SECRET", "test-signing-secret-of-sufficient-length");
    std::env::set_var("STORAGE_BACKEND", "local");
    std::env::set_var("LOCAL_STORAGE_PATH", "/tmp/audiomill-test");
    std::env::set_var("RUN_CONVERTER", "false");
    std::env::set_var("RUN_DISPATCHER", "false");
    Config::from_env().expect("test config from env")
}

/// Setup test app with in-memory backends and two seeded principals.
pub async fn setup_test_app() -> TestApp {
    let config = test_config();

    let credentials = MemoryCredentialStore::new();
    credentials.insert(PRIVILEGED_USER, PRIVILEGED_SECRET, true);
    credentials.insert(UNPRIVILEGED_USER, UNPRIVILEGED_SECRET, false);

    let token_service = Arc::new(TokenService::new(
        Arc::new(credentials.clone()),
        config.jwt_secret(),
        config.jwt_expiry_hours(),
    ));

    let source_store = MemoryBlobStore::new();
    let product_store = MemoryBlobStore::new();
    let queue = MemoryJobQueue::default();

    let source: Arc<dyn BlobStore> = Arc::new(source_store.clone());
    let product: Arc<dyn BlobStore> = Arc::new(product_store.clone());
    let queue_handle: Arc<dyn JobQueue> = Arc::new(queue.clone());

    let ingress = IngressService::new(source.clone(), queue_handle.clone());

    let state = Arc::new(AppState {
        config,
        token_service,
        source_store: source,
        product_store: product,
        queue: queue_handle,
        ingress,
        is_production: false,
    });

    let server = TestServer::new(build_router(state.clone())).expect("test server");

    TestApp {
        server,
        state,
        queue,
        source_store,
        product_store,
        credentials,
    }
}

/// Log in via the API and return the bearer token.
pub async fn login(app: &TestApp, username: &str, secret: &str) -> String {
    use base64::{engine::general_purpose, Engine as _};
    let encoded = general_purpose::STANDARD.encode(format!("{}:{}", username, secret));
    let response = app
        .server
        .post(&api_path("/login"))
        .add_header("Authorization", format!("Basic {}", encoded))
        .await;
    response.assert_status_ok();
    response.json::<serde_json::Value>()["token"]
        .as_str()
        .expect("token in login response")
        .to_string()
}

/// Codec double returning fixed bytes, or failing when `fail` is set.
pub struct StubCodec {
    pub output: Vec<u8>,
    pub fail: bool,
}

#[async_trait]
impl Codec for StubCodec {
    async fn transcode(&self, _source: &[u8]) -> Result<Vec<u8>, CodecError> {
        if self.fail {
            return Err(CodecError::Failed("stub codec failure".to_string()));
        }
        Ok(self.output.clone())
    }
}

/// Transport double recording every delivery.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(
        &self,
        recipient: &str,
        _subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        self.delivered
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}
