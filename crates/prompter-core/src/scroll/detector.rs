//! Engine-vs-user scroll classification
//!
//! The engine calls `mark_engine_scroll()` immediately before it writes a new
//! offset. The next scroll event the host forwards consumes that mark and is
//! attributed to the engine. Any event seen while running without a mark is
//! a genuine user interruption. `end_turn()` drops a mark whose write never
//! produced an event (e.g. the offset did not change).

use std::time::{Duration, Instant};

use tracing::debug;

/// Default distance from the bottom still treated as end-of-content
pub const DEFAULT_END_TOLERANCE: f64 = 1.0;

/// Lower bound on the interval between user-interruption notices
pub const MIN_NOTICE_INTERVAL: Duration = Duration::from_millis(1000);

/// Movement direction derived from consecutive scroll events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    Up,
    Down,
    #[default]
    None,
}

/// Who caused a scroll event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOrigin {
    /// Consumed an engine mark
    Engine,
    /// Unmarked event while the engine was running
    User,
    /// Unmarked event while idle; nothing to interrupt
    Idle,
}

/// Result of observing one scroll event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollObservation {
    pub origin: ScrollOrigin,
    pub direction: ScrollDirection,
    /// Whether the caller should surface a user-visible notice for this interruption
    pub notify: bool,
}

impl ScrollObservation {
    pub fn is_user_interruption(&self) -> bool {
        self.origin == ScrollOrigin::User
    }
}

#[derive(Debug, Clone)]
pub struct ScrollDetector {
    engine_mark: bool,
    user_scrolled: bool,
    direction: ScrollDirection,
    last_position: Option<f64>,
    tolerance: f64,
    notice_interval: Duration,
    last_notice: Option<Instant>,
}

impl Default for ScrollDetector {
    fn default() -> Self {
        Self::new(DEFAULT_END_TOLERANCE, MIN_NOTICE_INTERVAL)
    }
}

impl ScrollDetector {
    pub fn new(tolerance: f64, notice_interval: Duration) -> Self {
        Self {
            engine_mark: false,
            user_scrolled: false,
            direction: ScrollDirection::None,
            last_position: None,
            tolerance: if tolerance.is_finite() { tolerance.max(0.0) } else { DEFAULT_END_TOLERANCE },
            notice_interval: notice_interval.max(MIN_NOTICE_INTERVAL),
            last_notice: None,
        }
    }

    /// Flag the next scroll event as engine-driven
    #[inline]
    pub fn mark_engine_scroll(&mut self) {
        self.engine_mark = true;
    }

    /// Whether an engine mark is still waiting for its event
    #[inline]
    pub fn has_pending_mark(&self) -> bool {
        self.engine_mark
    }

    /// Scheduler turn boundary: any mark left now belonged to a write that fired no event
    #[inline]
    pub fn end_turn(&mut self) {
        self.engine_mark = false;
    }

    #[inline]
    pub fn user_scrolled(&self) -> bool {
        self.user_scrolled
    }

    pub fn reset_user_scrolled(&mut self) {
        self.user_scrolled = false;
    }

    #[inline]
    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True when `position` is within tolerance of `max_scroll`
    #[inline]
    pub fn check_at_end(&self, position: f64, max_scroll: f64) -> bool {
        if !position.is_finite() || !max_scroll.is_finite() {
            return false;
        }
        position >= max_scroll - self.tolerance
    }

    /// Forget the last position, e.g. after the host swapped content
    pub fn reset_position(&mut self, position: f64) {
        self.last_position = Some(position);
        self.direction = ScrollDirection::None;
    }

    /// Follow an offset the container moved on its own (layout clamp)
    ///
    /// Leaves any pending engine mark in place.
    pub fn sync_position(&mut self, position: f64) {
        self.last_position = Some(position);
    }

    /// Classify one scroll event forwarded by the host
    pub fn observe(&mut self, position: f64, running: bool, now: Instant) -> ScrollObservation {
        self.direction = match self.last_position {
            Some(prev) if position > prev => ScrollDirection::Down,
            Some(prev) if position < prev => ScrollDirection::Up,
            Some(_) => self.direction,
            None => ScrollDirection::None,
        };
        self.last_position = Some(position);

        if self.engine_mark {
            self.engine_mark = false;
            return ScrollObservation {
                origin: ScrollOrigin::Engine,
                direction: self.direction,
                notify: false,
            };
        }

        if !running {
            return ScrollObservation {
                origin: ScrollOrigin::Idle,
                direction: self.direction,
                notify: false,
            };
        }

        self.user_scrolled = true;
        let notify = match self.last_notice {
            Some(last) => now.saturating_duration_since(last) >= self.notice_interval,
            None => true,
        };
        if notify {
            self.last_notice = Some(now);
        }
        debug!(position, direction = ?self.direction, notify, "User scroll interrupted playback");

        ScrollObservation {
            origin: ScrollOrigin::User,
            direction: self.direction,
            notify,
        }
    }
}
