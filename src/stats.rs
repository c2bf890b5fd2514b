//! Stream health tracking.
//!
//! The receive loop is the only writer of frame-rate and freshness data; the
//! consumer records pick-up latency and reads everything at its own cadence.
//! The scalar fields live in atomics so concurrent readers never contend with
//! the hot receive path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// The stream counts as idle once no frame has arrived for this long.
pub const STALE_AFTER: Duration = Duration::from_secs(2);

/// Sentinel for "no frame received yet".
const NEVER: u64 = u64::MAX;

/// Shared, lock-free view of stream health.
///
/// Cheap to clone; all clones observe the same counters.
#[derive(Debug, Clone)]
pub struct StreamStats {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Reference point for the microsecond offsets stored below.
    epoch: Instant,
    /// Rolled-up frames-per-second, stored as `f64` bits.
    fps_bits: AtomicU64,
    /// Receive-to-pickup delay of the most recent consumed frame, in µs.
    latency_us: AtomicU64,
    /// Microseconds from `epoch` to the most recent frame, or [`NEVER`].
    last_frame_us: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                epoch: Instant::now(),
                fps_bits: AtomicU64::new(0f64.to_bits()),
                latency_us: AtomicU64::new(0),
                last_frame_us: AtomicU64::new(NEVER),
            }),
        }
    }

    /// Frames per second over the most recent completed 1-second window.
    pub fn fps(&self) -> f64 {
        f64::from_bits(self.inner.fps_bits.load(Ordering::Relaxed))
    }

    /// Delay between receipt and consumer pick-up of the last consumed frame.
    pub fn latency_ms(&self) -> f64 {
        self.inner.latency_us.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// When the most recent frame arrived, if any has.
    pub fn last_updated(&self) -> Option<Instant> {
        match self.inner.last_frame_us.load(Ordering::Relaxed) {
            NEVER => None,
            us => Some(self.inner.epoch + Duration::from_micros(us)),
        }
    }

    /// Whether the stream is actively delivering frames.
    ///
    /// True once a frame-rate window has rolled and the latest frame is
    /// younger than [`STALE_AFTER`].
    pub fn is_active(&self) -> bool {
        self.is_active_at(Instant::now())
    }

    /// [`is_active`](Self::is_active) evaluated against an explicit clock
    /// reading.
    pub fn is_active_at(&self, now: Instant) -> bool {
        let Some(last) = self.last_updated() else {
            return false;
        };
        self.fps() > 0.0 && now.saturating_duration_since(last) < STALE_AFTER
    }

    /// Snapshot for display. Idle streams report `None` for both rates so a
    /// UI can fall back to its placeholder text.
    pub fn report(&self) -> StatsReport {
        self.report_at(Instant::now())
    }

    /// [`report`](Self::report) evaluated against an explicit clock reading.
    pub fn report_at(&self, now: Instant) -> StatsReport {
        if self.is_active_at(now) {
            StatsReport {
                fps: Some(self.fps()),
                latency_ms: Some(self.latency_ms()),
                active: true,
            }
        } else {
            StatsReport { fps: None, latency_ms: None, active: false }
        }
    }

    /// Record a frame arrival. Called by the receive loop for every frame.
    pub(crate) fn record_frame(&self, at: Instant) {
        let us = at.saturating_duration_since(self.inner.epoch).as_micros() as u64;
        self.inner.last_frame_us.store(us, Ordering::Relaxed);
    }

    /// Publish a rolled-up window rate.
    pub(crate) fn set_fps(&self, fps: f64) {
        self.inner.fps_bits.store(fps.to_bits(), Ordering::Relaxed);
    }

    /// Record how long a consumed frame waited in the hand-off slot.
    pub(crate) fn record_latency(&self, delay: Duration) {
        self.inner.latency_us.store(delay.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Display-ready snapshot of [`StreamStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Frames per second, or `None` when idle.
    pub fps: Option<f64>,
    /// Pick-up latency in milliseconds, or `None` when idle.
    pub latency_ms: Option<f64>,
    /// Whether frames are currently flowing.
    pub active: bool,
}

/// Rolling 1-second frame counter.
///
/// Counts frames from the start of the current window; once at least one
/// second has elapsed, the rate is computed over the actual elapsed time and
/// the window restarts at the triggering frame. Deliberately a discrete
/// window, not a moving average.
#[derive(Debug)]
pub(crate) struct FpsWindow {
    window_start: Instant,
    frames: u32,
}

impl FpsWindow {
    pub(crate) fn new(now: Instant) -> Self {
        Self { window_start: now, frames: 0 }
    }

    /// Count one frame; returns the window rate when the window rolls.
    pub(crate) fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        if elapsed >= 1.0 {
            let fps = f64::from(self.frames) / elapsed;
            self.frames = 0;
            self.window_start = now;
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn thirty_frames_in_one_second_is_thirty_fps() {
        let t0 = Instant::now();
        let mut window = FpsWindow::new(t0);

        // 30 frames, the last one landing exactly on the window boundary
        for i in 1..=30u64 {
            let at = t0 + Duration::from_micros(i * 1_000_000 / 30);
            let rolled = window.record(at);
            if i < 30 {
                assert_eq!(rolled, None);
            } else {
                let fps = rolled.expect("window should roll at 1.0s");
                assert!((fps - 30.0).abs() < 1e-6, "expected 30.0, got {fps}");
            }
        }
    }

    #[test]
    fn window_restarts_after_rolling() {
        let t0 = Instant::now();
        let mut window = FpsWindow::new(t0);

        assert_eq!(window.record(t0 + ms(500)), None);
        let fps = window.record(t0 + ms(1250)).expect("first roll");
        assert!((fps - 2.0 / 1.25).abs() < 1e-6);

        // New window starts at 1250ms; one frame 1s later gives 1 fps
        assert_eq!(window.record(t0 + ms(2000)), None);
        let fps = window.record(t0 + ms(2250)).expect("second roll");
        assert!((fps - 2.0).abs() < 1e-6);
    }

    #[test]
    fn stats_start_idle() {
        let stats = StreamStats::new();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.last_updated(), None);
        assert!(!stats.is_active());
        assert_eq!(stats.report(), StatsReport { fps: None, latency_ms: None, active: false });
    }

    #[test]
    fn staleness_flips_active_off() {
        let stats = StreamStats::new();
        let now = Instant::now();

        stats.set_fps(30.0);
        stats.record_frame(now);

        assert!(stats.is_active_at(now + ms(500)));
        assert!(stats.is_active_at(now + ms(1999)));
        // 2-second threshold: stream goes idle and the report resets
        assert!(!stats.is_active_at(now + ms(2000)));
        let report = stats.report_at(now + ms(2500));
        assert_eq!(report.fps, None);
        assert!(!report.active);
    }

    #[test]
    fn active_report_carries_values() {
        let stats = StreamStats::new();
        let now = Instant::now();

        stats.set_fps(29.5);
        stats.record_frame(now);
        stats.record_latency(ms(12));

        let report = stats.report_at(now + ms(100));
        assert!(report.active);
        assert_eq!(report.fps, Some(29.5));
        assert_eq!(report.latency_ms, Some(12.0));
    }

    #[test]
    fn fresh_frames_without_a_rolled_window_are_not_active() {
        // fps stays 0.0 until the first 1-second window completes
        let stats = StreamStats::new();
        let now = Instant::now();
        stats.record_frame(now);
        assert!(!stats.is_active_at(now + ms(100)));
    }

    #[test]
    fn clones_share_counters() {
        let stats = StreamStats::new();
        let clone = stats.clone();
        stats.set_fps(15.0);
        assert_eq!(clone.fps(), 15.0);
    }
}
