//! Shared pieces of the RTP level monitor.
//!
//! - [`rtp`]: RTP framing (`StreamEncoder`) and header decoding.
//! - [`level`]: RMS / decibel measurement of 16-bit PCM payloads.
//! - [`cli`] and [`observability`]: color policy, tracing and Prometheus
//!   metrics used by both binaries.

pub mod cli;
pub mod level;
pub mod observability;
pub mod rtp;

pub use cli::ColorWhen;
pub use level::{compute_level, LevelReading, SILENCE_FLOOR_DB};
pub use observability::{init_tracing, MetricsContext, MetricsServerConfig};
pub use rtp::{decode_header, HeaderFields, PacketError, RtpPacket, StreamEncoder};
