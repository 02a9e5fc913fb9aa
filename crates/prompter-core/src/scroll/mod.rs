//! Auto-scroll engine for Prompter
//!
//! Moves a read-only text viewport at a steady, user-chosen speed while
//! staying out of the way of the reader's own scrolling.
//!
//! # Architecture
//!
//! ## Pure layer
//! - `math` - Geometry and per-frame motion (max scroll, depth ratio, frame delta)
//!
//! ## Components
//! - `viewport` - The host seam the engine reads from and writes to
//! - `detector` - Tells engine writes from user scrolls, end-of-content check
//! - `reconciler` - Keeps the reading ratio across font size reflows
//! - `fps` - Frame timing diagnostics
//!
//! ## Orchestration
//! - `engine` - Frame loop, lifecycle, deceleration, visibility, wake lock
//!
//! # Usage
//!
//! ```ignore
//! use prompter_core::scroll::{EngineSettings, MemoryViewport, ScrollEngine};
//! use prompter_core::wake_lock::WakeLockController;
//!
//! let mut engine = ScrollEngine::new(
//!     MemoryViewport::new(5000.0, 1000.0),
//!     WakeLockController::unsupported(),
//!     EngineSettings::default(),
//!     1.0,
//!     28.0,
//! );
//! engine.start().await?;
//!
//! // In the render loop
//! engine.on_frame(Instant::now());
//! for position in engine.viewport_mut().take_events() {
//!     engine.handle_scroll_event(position, Instant::now());
//! }
//! ```

pub mod math;

pub mod detector;
pub mod fps;
pub mod reconciler;
pub mod viewport;

pub mod engine;

pub use detector::{ScrollDetector, ScrollDirection, ScrollObservation, ScrollOrigin};
pub use engine::{
    EngineEvent, EnginePhase, EngineSettings, FrameOutcome, FrameTicket, ScrollEngine,
    ScrollState,
};
pub use fps::{FpsMonitor, FpsReport};
pub use reconciler::{FontSizeReconciler, ScrollRatioSnapshot};
pub use viewport::{MemoryViewport, Viewport};

/// Slowest speed setting (paused in place)
pub const MIN_SPEED: f64 = 0.0;
/// Fastest speed setting
pub const MAX_SPEED: f64 = 5.0;

/// Clamp a speed setting into `[MIN_SPEED, MAX_SPEED]`; non-finite input maps to `MIN_SPEED`
#[inline]
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        MIN_SPEED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed() {
        assert_eq!(clamp_speed(1.5), 1.5);
        assert_eq!(clamp_speed(-0.5), 0.0);
        assert_eq!(clamp_speed(12.0), 5.0);
        assert_eq!(clamp_speed(f64::INFINITY), 0.0);
        assert_eq!(clamp_speed(f64::NAN), 0.0);
    }
}
