//! Configuration module
//!
//! Env-based configuration for the gateway and workers. Loaded once at
//! startup; the signing secret and all connection settings are process-wide
//! and never rotated at runtime.

use std::env;

// Common defaults
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;
const QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const QUEUE_MAX_DELIVERY_ATTEMPTS: i32 = 5;
const QUEUE_VISIBILITY_TIMEOUT_SECS: i64 = 600;
const QUEUE_REAP_INTERVAL_SECS: u64 = 60;
const CODEC_TIMEOUT_SECS: u64 = 600;
const MIN_JWT_SECRET_LEN: usize = 32;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    server_port: u16,
    environment: String,
    cors_origins: Vec<String>,

    database_url: String,
    db_max_connections: u32,
    db_timeout_seconds: u64,

    jwt_secret: String,
    jwt_expiry_hours: i64,

    storage_backend: StorageBackend,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_endpoint: Option<String>,
    local_storage_path: Option<String>,

    max_upload_bytes: usize,

    queue_poll_interval_ms: u64,
    queue_max_delivery_attempts: i32,
    queue_visibility_timeout_secs: i64,
    queue_reap_interval_secs: u64,

    ffmpeg_path: String,
    codec_timeout_secs: u64,

    run_converter: bool,
    run_dispatcher: bool,
    converter_instances: usize,
    dispatcher_instances: usize,

    smtp_host: Option<String>,
    smtp_port: u16,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
    smtp_from: Option<String>,
    smtp_tls: bool,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment (and `.env` when present).
    ///
    /// Fails when a required value is missing or structurally invalid so that
    /// misconfiguration is caught at startup rather than on first request.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env_opt("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let jwt_secret =
            env_opt("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LEN
            );
        }

        let storage_backend = match env_opt("STORAGE_BACKEND").as_deref() {
            Some("s3") => StorageBackend::S3,
            Some("local") | None => StorageBackend::Local,
            Some(other) => anyhow::bail!("Unknown STORAGE_BACKEND '{}'", other),
        };

        let s3_bucket = env_opt("S3_BUCKET");
        let local_storage_path = env_opt("LOCAL_STORAGE_PATH");
        match storage_backend {
            StorageBackend::S3 if s3_bucket.is_none() => {
                anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3")
            }
            StorageBackend::Local if local_storage_path.is_none() => {
                anyhow::bail!("LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local")
            }
            _ => {}
        }

        let cors_origins = env_opt("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_port: env_parse("SERVER_PORT", 8080),
            environment: env_opt("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            cors_origins,

            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),

            jwt_secret,
            jwt_expiry_hours: env_parse("JWT_EXPIRY_HOURS", JWT_EXPIRY_HOURS),

            storage_backend,
            s3_bucket,
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            local_storage_path,

            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES),

            queue_poll_interval_ms: env_parse("QUEUE_POLL_INTERVAL_MS", QUEUE_POLL_INTERVAL_MS),
            queue_max_delivery_attempts: env_parse(
                "QUEUE_MAX_DELIVERY_ATTEMPTS",
                QUEUE_MAX_DELIVERY_ATTEMPTS,
            ),
            queue_visibility_timeout_secs: env_parse(
                "QUEUE_VISIBILITY_TIMEOUT_SECS",
                QUEUE_VISIBILITY_TIMEOUT_SECS,
            ),
            queue_reap_interval_secs: env_parse(
                "QUEUE_REAP_INTERVAL_SECS",
                QUEUE_REAP_INTERVAL_SECS,
            ),

            ffmpeg_path: env_opt("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            codec_timeout_secs: env_parse("CODEC_TIMEOUT_SECS", CODEC_TIMEOUT_SECS),

            run_converter: env_bool("RUN_CONVERTER", true),
            run_dispatcher: env_bool("RUN_DISPATCHER", true),
            converter_instances: env_parse("CONVERTER_INSTANCES", 1).max(1),
            dispatcher_instances: env_parse("DISPATCHER_INSTANCES", 1).max(1),

            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env_parse("SMTP_PORT", 587),
            smtp_user: env_opt("SMTP_USER"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            smtp_from: env_opt("SMTP_FROM"),
            smtp_tls: env_bool("SMTP_TLS", true),
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.jwt_expiry_hours
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn queue_poll_interval_ms(&self) -> u64 {
        self.queue_poll_interval_ms
    }

    pub fn queue_max_delivery_attempts(&self) -> i32 {
        self.queue_max_delivery_attempts
    }

    pub fn queue_visibility_timeout_secs(&self) -> i64 {
        self.queue_visibility_timeout_secs
    }

    pub fn queue_reap_interval_secs(&self) -> u64 {
        self.queue_reap_interval_secs
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn codec_timeout_secs(&self) -> u64 {
        self.codec_timeout_secs
    }

    pub fn run_converter(&self) -> bool {
        self.run_converter
    }

    pub fn run_dispatcher(&self) -> bool {
        self.run_dispatcher
    }

    pub fn converter_instances(&self) -> usize {
        self.converter_instances
    }

    pub fn dispatcher_instances(&self) -> usize {
        self.dispatcher_instances
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.smtp_tls
    }
}
