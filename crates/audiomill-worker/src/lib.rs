//! Pipeline workers
//!
//! Long-lived queue consumers: the conversion worker turns uploaded media
//! into audio artifacts, the notification dispatcher tells owners their
//! artifact is ready. Each instance processes one message at a time;
//! transcoding is memory- and CPU-heavy, so concurrency comes from running
//! more instances, not from overlapping messages within one.

pub mod codec;
pub mod converter;
pub mod notifier;
pub mod transport;

pub use codec::{Codec, CodecError, FfmpegCodec};
pub use converter::{ConversionWorker, Disposition};
pub use notifier::NotificationDispatcher;
pub use transport::{EmailTransport, Transport, TransportError};
