//! Single-slot frame hand-off between the receive loop and the display side.
//!
//! The slot always favors recency over completeness: a push evicts whatever
//! is still sitting in the slot, and a push that races a draining consumer is
//! simply dropped. Neither side ever blocks.

use std::sync::Mutex;

use tracing::trace;

use crate::frame::FramePacket;

/// Capacity-1 buffer with a replace-on-full policy.
#[derive(Debug, Default)]
pub struct FrameSlot {
    cell: Mutex<Option<FramePacket>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, discarding any undrained occupant.
    ///
    /// Never blocks: if the consumer holds the slot at this instant, the new
    /// frame is dropped instead; the next one is at most a frame-interval
    /// away.
    pub fn push(&self, packet: FramePacket) {
        match self.cell.try_lock() {
            Ok(mut slot) => {
                if let Some(stale) = slot.replace(packet) {
                    trace!(sequence = stale.sequence, "evicted undrained frame");
                }
            }
            Err(_) => {
                trace!("slot contended, dropping frame");
            }
        }
    }

    /// Take the stored frame, if any. Never blocks; emptiness is a normal
    /// result, not an error.
    pub fn try_pop(&self) -> Option<FramePacket> {
        self.cell.try_lock().ok().and_then(|mut slot| slot.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn packet(byte: u8, sequence: u64) -> FramePacket {
        FramePacket::new(vec![byte; 4], Instant::now(), sequence)
    }

    #[test]
    fn pop_returns_pushed_frame_once() {
        let slot = FrameSlot::new();
        slot.push(packet(0xAB, 1));

        let got = slot.try_pop().expect("frame should be present");
        assert_eq!(got.data.as_ref(), &[0xAB; 4]);
        assert!(slot.try_pop().is_none(), "slot must be empty after draining");
    }

    #[test]
    fn second_push_evicts_first() {
        let slot = FrameSlot::new();
        slot.push(packet(0x01, 1));
        slot.push(packet(0x02, 2));

        let got = slot.try_pop().expect("newest frame should be present");
        assert_eq!(got.sequence, 2);
        assert!(slot.try_pop().is_none(), "evicted frame must not reappear");
    }

    #[test]
    fn empty_pop_is_silent() {
        let slot = FrameSlot::new();
        assert!(slot.try_pop().is_none());
    }
}
