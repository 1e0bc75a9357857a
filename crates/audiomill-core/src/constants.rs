//! Shared constants

/// API path prefix for all versioned routes.
pub const API_PREFIX: &str = "/api/v0";

/// Queue topic carrying freshly submitted conversion jobs.
pub const TOPIC_VIDEO: &str = "video";

/// Queue topic carrying completed conversions awaiting notification.
pub const TOPIC_MP3: &str = "mp3";

/// Key prefix for the source (uploaded media) blob collection.
pub const SOURCE_PREFIX: &str = "videos";

/// Key prefix for the product (converted audio) blob collection.
pub const PRODUCT_PREFIX: &str = "audio";

/// Content type of produced artifacts.
pub const PRODUCT_CONTENT_TYPE: &str = "audio/mpeg";
