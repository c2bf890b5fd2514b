//! Async frame stream with optional rate capping.
//!
//! The polling contract ([`VideoServer::try_pop_frame`]) is the primary
//! consumer interface; this module offers the same frames as an async
//! `Stream` for consumers that prefer awaiting over polling. Both views share
//! latest-frame semantics: a slow subscriber skips frames, it never lags
//! behind them.
//!
//! [`VideoServer::try_pop_frame`]: crate::VideoServer::try_pop_frame

use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;

use crate::frame::FramePacket;

/// Delivery rate for a frame stream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FrameRate {
    /// Every frame the producer delivers.
    Native,

    /// At most this many frames per second; intermediate frames are skipped
    /// in favor of the newest one. Useful for capping a UI redraw rate below
    /// the camera rate.
    Max(u32),
}

impl FrameRate {
    /// Minimum spacing between emitted frames, if capped.
    ///
    /// `Max(0)` is treated as `Native` rather than dividing by zero.
    pub fn interval(self) -> Option<Duration> {
        match self {
            FrameRate::Native => None,
            FrameRate::Max(0) => None,
            FrameRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

/// Turn a watch subscription into a frame stream at the requested rate.
///
/// The stream skips `None` slots (no frame yet, or producer between
/// connections) and ends when the server is dropped.
pub(crate) fn frame_stream(
    rx: watch::Receiver<Option<FramePacket>>,
    rate: FrameRate,
) -> BoxStream<'static, FramePacket> {
    match rate.interval() {
        None => WatchStream::new(rx).filter_map(|opt| async move { opt }).boxed(),
        Some(period) => {
            // The ticker is created on first poll, inside the runtime; the
            // stream itself may be built from a non-async context.
            let state = (rx, None::<tokio::time::Interval>);
            futures::stream::unfold(state, move |(mut rx, mut ticker)| async move {
                loop {
                    // Wait for a new frame, then gate emission on the ticker;
                    // whatever arrived in the meantime collapses to the newest.
                    if rx.changed().await.is_err() {
                        return None;
                    }
                    let active = ticker.get_or_insert_with(|| {
                        let mut t = tokio::time::interval(period);
                        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        t
                    });
                    active.tick().await;
                    let latest = rx.borrow_and_update().clone();
                    if let Some(packet) = latest {
                        return Some((packet, (rx, ticker)));
                    }
                }
            })
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::time::timeout;

    fn packet(sequence: u64) -> FramePacket {
        FramePacket::new(vec![sequence as u8], Instant::now(), sequence)
    }

    #[test]
    fn interval_normalization() {
        assert_eq!(FrameRate::Native.interval(), None);
        assert_eq!(FrameRate::Max(0).interval(), None);
        assert_eq!(FrameRate::Max(50).interval(), Some(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn native_stream_skips_empty_slots_and_yields_frames() {
        let (tx, rx) = watch::channel(None);
        let mut stream = frame_stream(rx, FrameRate::Native);

        tx.send(Some(packet(1))).unwrap();
        let got = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should yield promptly")
            .expect("stream should not end while sender lives");
        assert_eq!(got.sequence, 1);
    }

    #[tokio::test]
    async fn stream_ends_when_sender_dropped() {
        let (tx, rx) = watch::channel(None);
        let mut stream = frame_stream(rx, FrameRate::Native);
        drop(tx);
        let got = timeout(Duration::from_secs(1), stream.next()).await.expect("should resolve");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn capped_stream_collapses_bursts_to_newest() {
        let (tx, rx) = watch::channel(None);
        let mut stream = frame_stream(rx, FrameRate::Max(20));

        tx.send(Some(packet(1))).unwrap();
        let first = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("first frame should arrive")
            .expect("stream alive");
        assert_eq!(first.sequence, 1);

        // A burst faster than the cap: only the newest survives
        for sequence in 2..=5 {
            tx.send(Some(packet(sequence))).unwrap();
        }
        let second = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("paced frame should arrive")
            .expect("stream alive");
        assert_eq!(second.sequence, 5);
    }
}
