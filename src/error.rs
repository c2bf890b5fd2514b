//! Error types for the frame-stream service.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The receive loop treats most of these as connection-ending rather
//! than fatal: the service drops the producer and returns to listening.
//!
//! ## Error Categories
//!
//! - **Bind Errors**: the listener could not be established; fatal to `start()`
//! - **Accept Errors**: a connection could not be accepted
//! - **I/O Errors**: read/write failures on an active producer connection
//! - **Timeouts**: a silent or stalled producer
//! - **Framing Errors**: an out-of-range frame length in the wire header
//!
//! ## Recovery
//!
//! Errors report whether a retry can help:
//!
//! ```rust
//! use viewfinder::StreamError;
//! use std::time::Duration;
//!
//! let error = StreamError::Timeout { duration: Duration::from_secs(5) };
//! if error.is_retryable() {
//!     println!("The producer can simply reconnect");
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for frame-stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for the frame-stream service.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Failed to bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept producer connection")]
    Accept {
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during {context}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Frame length {length} outside accepted range 1..={max}")]
    FrameLength { length: u32, max: u32 },
}

impl StreamError {
    /// Returns whether the condition clears itself once the producer
    /// reconnects (or simply retries).
    ///
    /// Bind failures and framing violations are not retryable: the first
    /// needs a different address or a freed port, the second means the byte
    /// stream can no longer be trusted.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Bind { .. } => false,
            StreamError::Accept { .. } => true,
            StreamError::Io { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::FrameLength { .. } => false,
        }
    }

    /// Helper constructor for listener bind failures.
    pub fn bind_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        StreamError::Bind { addr, source }
    }

    /// Helper constructor for accept failures.
    pub fn accept_failed(source: std::io::Error) -> Self {
        StreamError::Accept { source }
    }

    /// Helper constructor for connection I/O failures.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        StreamError::Io { context, source }
    }

    /// Helper constructor for out-of-range frame lengths.
    pub fn frame_length(length: u32, max: u32) -> Self {
        StreamError::FrameLength { length, max }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io { context: "socket", source: err }
    }
}
