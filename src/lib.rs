//! Async TCP receiver for live camera frame streams.
//!
//! Viewfinder accepts a single remote producer (typically a phone camera
//! app) over a raw TCP connection, keeps the newest frame available for a
//! display surface, tracks stream health, and relays short text commands
//! back to the producer over the same socket.
//!
//! # Features
//!
//! - **Length-prefixed framing**: 4-byte big-endian headers, 5 MiB cap
//! - **Latest-frame hand-off**: capacity-1 slot with a drop-oldest policy
//! - **Stream health**: windowed FPS, pick-up latency, staleness detection
//! - **Reverse control channel**: `ZOOM:2.50`-style commands to the producer
//! - **Non-blocking consumer contract**: polling and async-stream views
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use viewfinder::{ServerConfig, VideoServer};
//!
//! #[tokio::main]
//! async fn main() -> viewfinder::Result<()> {
//!     let server = VideoServer::new(ServerConfig::default());
//!     server.start().await?;
//!
//!     loop {
//!         if let Some(frame) = server.try_pop_frame() {
//!             println!("frame {}: {} bytes", frame.sequence, frame.len());
//!         }
//!         if server.stats().is_active() {
//!             server.send_control_command("ZOOM:2.50");
//!         }
//!         tokio::time::sleep(Duration::from_millis(17)).await;
//!     }
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
pub mod control;
mod error;
pub mod frame;
pub mod net_util;
pub mod stats;

// Service architecture
pub mod server;
pub mod slot;
pub mod stream;

// Core exports
pub use codec::MAX_FRAME_LEN;
pub use config::{DEFAULT_PORT, ServerConfig};
pub use control::ControlChannel;
pub use error::{Result, StreamError};
pub use frame::FramePacket;
pub use net_util::local_addresses;

// Service exports
pub use server::{ConnectionState, VideoServer};
pub use slot::FrameSlot;
pub use stats::{STALE_AFTER, StatsReport, StreamStats};
pub use stream::FrameRate;
