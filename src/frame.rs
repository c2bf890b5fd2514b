//! Frame packet type handed from the receive loop to consumers.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// One received camera frame.
///
/// The payload is the opaque encoded image exactly as the producer sent it
/// (typically JPEG); the service never inspects it. Cloning is cheap: the
/// payload is shared via `Arc`, so the hand-off slot and any stream
/// subscribers see the same allocation.
#[derive(Debug, Clone)]
pub struct FramePacket {
    /// Encoded image payload (zero-copy via Arc).
    pub data: Arc<[u8]>,

    /// When the receive loop finished reading this frame.
    pub received_at: Instant,

    /// Monotonic frame counter, increasing across reconnects.
    pub sequence: u64,
}

impl FramePacket {
    /// Create a new frame packet.
    pub fn new(data: Vec<u8>, received_at: Instant, sequence: u64) -> Self {
        Self { data: data.into(), received_at, sequence }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty. Never true for frames produced by the
    /// receive loop, which rejects zero-length headers.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Time elapsed since the frame was received.
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}
