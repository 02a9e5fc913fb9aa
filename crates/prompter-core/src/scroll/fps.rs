//! Frame timing diagnostics (dev only, not needed for correctness)

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of frame intervals kept for the rolling statistics
const WINDOW: usize = 120;

/// Snapshot of recent frame timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    pub average_fps: f64,
    pub worst_frame: Duration,
    pub dropped_frames: usize,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct FpsMonitor {
    target_interval: Duration,
    intervals: VecDeque<Duration>,
    last_frame: Option<Instant>,
}

impl FpsMonitor {
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_interval: Duration::from_secs_f64(1.0 / target_fps as f64),
            intervals: VecDeque::with_capacity(WINDOW),
            last_frame: None,
        }
    }

    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            if self.intervals.len() == WINDOW {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_duration_since(last));
        }
        self.last_frame = Some(now);
    }

    /// Forget the previous timestamp so a pause is not counted as a long frame
    pub fn pause(&mut self) {
        self.last_frame = None;
    }

    pub fn average_fps(&self) -> f64 {
        let total: Duration = self.intervals.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.intervals.len() as f64 / total.as_secs_f64()
    }

    pub fn worst_frame(&self) -> Duration {
        self.intervals.iter().copied().max().unwrap_or_default()
    }

    /// Frames that took more than twice the target interval
    pub fn dropped_frames(&self) -> usize {
        let limit = self.target_interval * 2;
        self.intervals.iter().filter(|d| **d > limit).count()
    }

    pub fn report(&self) -> FpsReport {
        FpsReport {
            average_fps: self.average_fps(),
            worst_frame: self.worst_frame(),
            dropped_frames: self.dropped_frames(),
            samples: self.intervals.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_frames() {
        let t0 = Instant::now();
        let mut monitor = FpsMonitor::new(60);
        for i in 0..=60 {
            monitor.record(t0 + Duration::from_millis(20 * i));
        }
        let report = monitor.report();
        assert_eq!(report.samples, 60);
        assert!((report.average_fps - 50.0).abs() < 0.01);
        assert_eq!(report.dropped_frames, 0);
        assert_eq!(report.worst_frame, Duration::from_millis(20));
    }

    #[test]
    fn test_dropped_frame_detected() {
        let t0 = Instant::now();
        let mut monitor = FpsMonitor::new(60);
        monitor.record(t0);
        monitor.record(t0 + Duration::from_millis(16));
        monitor.record(t0 + Duration::from_millis(116));
        assert_eq!(monitor.dropped_frames(), 1);
        assert_eq!(monitor.worst_frame(), Duration::from_millis(100));
    }

    #[test]
    fn test_window_is_bounded() {
        let t0 = Instant::now();
        let mut monitor = FpsMonitor::new(60);
        for i in 0..500 {
            monitor.record(t0 + Duration::from_millis(16 * i));
        }
        assert_eq!(monitor.report().samples, WINDOW);
    }

    #[test]
    fn test_pause_skips_gap() {
        let t0 = Instant::now();
        let mut monitor = FpsMonitor::new(60);
        monitor.record(t0);
        monitor.pause();
        monitor.record(t0 + Duration::from_secs(10));
        assert_eq!(monitor.report().samples, 0);
        assert_eq!(monitor.average_fps(), 0.0);
    }
}
