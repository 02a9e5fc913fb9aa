//! Auto-scroll engine
//!
//! Drives the viewport at the configured speed, one frame at a time. The host
//! calls `on_frame` from its render loop; the engine only does work when it
//! holds a scheduled frame ticket, and it issues the next ticket only after
//! the current frame has finished, so at most one frame is ever outstanding.
//! Dropping the runtime cancels the outstanding ticket.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::detector::{ScrollDetector, ScrollDirection, ScrollObservation, ScrollOrigin};
use super::fps::FpsMonitor;
use super::math::{
    clamp_position, content_scrollable, delta_for_frame, depth_from_position, max_scroll,
    position_from_depth,
};
use super::reconciler::FontSizeReconciler;
use super::viewport::Viewport;
use super::clamp_speed;
use crate::config::AppConfig;
use crate::error::WakeLockError;
use crate::wake_lock::{WakeLockController, WakeLockMode};
use crate::Result;

/// Engine tuning derived from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_rate: f64,
    pub damping_factor: f64,
    pub stop_epsilon: f64,
    pub end_tolerance: f64,
    pub progress_interval: Duration,
    pub frame_interval: Duration,
    pub max_frame_delta: Duration,
    pub settle_passes: u32,
    pub notice_debounce: Duration,
    pub fps_monitor: bool,
    pub fps_report_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let scroll = &config.scroll;
        Self {
            base_rate: scroll.base_rate_px_per_sec,
            damping_factor: scroll.damping_factor,
            stop_epsilon: scroll.stop_epsilon,
            end_tolerance: scroll.end_tolerance_px,
            progress_interval: Duration::from_millis(scroll.progress_interval_ms),
            frame_interval: Duration::from_secs_f64(1.0 / scroll.frame_rate.max(1) as f64),
            max_frame_delta: Duration::from_millis(scroll.max_frame_delta_ms),
            settle_passes: scroll.settle_passes,
            notice_debounce: Duration::from_millis(scroll.user_notice_debounce_ms),
            fps_monitor: config.debug.fps_monitor,
            fps_report_interval: Duration::from_secs(config.debug.fps_report_interval_secs),
        }
    }
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Running,
    Decelerating,
}

/// Externally visible scroll state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    /// User-chosen rate, 0.0 - 5.0
    pub speed_setting: f64,
    pub is_running: bool,
    /// Scroll offset in pixels
    pub position: f64,
    /// Position as a ratio of the scrollable distance
    pub depth: f64,
    pub font_size: f64,
}

/// Handle for the single outstanding frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket(u64);

/// Per-session state, dropped on every full stop
#[derive(Debug, Clone)]
struct EngineRuntime {
    current_speed: f64,
    last_frame: Option<Instant>,
    is_decelerating: bool,
    scheduled: Option<FrameTicket>,
}

/// Notifications for the host and progress consumers
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Started,
    /// Throttled reading progress
    Progress { depth: f64 },
    /// End of content reached
    Completed,
    /// Returned to idle
    Stopped,
    /// Manual scroll paused playback (debounced)
    UserInterrupted,
    /// Non-blocking wake lock problem
    WakeLockWarning { message: String },
}

/// What a call to `on_frame` did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// No frame was scheduled; nothing happened
    NotScheduled,
    /// Host hidden or layout reflowing; position untouched
    Skipped,
    Advanced { position: f64 },
    Stopped,
    Completed,
}

pub struct ScrollEngine<V: Viewport> {
    viewport: V,
    settings: EngineSettings,
    state: ScrollState,
    phase: EnginePhase,
    runtime: Option<EngineRuntime>,
    next_ticket: u64,
    detector: ScrollDetector,
    reconciler: FontSizeReconciler,
    wake_lock: WakeLockController,
    visible: bool,
    last_progress: Option<Instant>,
    fps: Option<FpsMonitor>,
    last_fps_report: Option<Instant>,
    event_tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl<V: Viewport> ScrollEngine<V> {
    pub fn new(
        viewport: V,
        wake_lock: WakeLockController,
        settings: EngineSettings,
        speed_setting: f64,
        font_size: f64,
    ) -> Self {
        let position = viewport.position();
        let depth = depth_from_position(position, viewport.content_height(), viewport.viewport_height());
        let detector = ScrollDetector::new(settings.end_tolerance, settings.notice_debounce);
        let reconciler = FontSizeReconciler::new(font_size, settings.settle_passes);
        let fps = settings
            .fps_monitor
            .then(|| FpsMonitor::new((1.0 / settings.frame_interval.as_secs_f64()).round() as u32));

        Self {
            viewport,
            settings,
            state: ScrollState {
                speed_setting: clamp_speed(speed_setting),
                is_running: false,
                position,
                depth,
                font_size,
            },
            phase: EnginePhase::Idle,
            runtime: None,
            next_ticket: 0,
            detector,
            reconciler,
            wake_lock,
            visible: true,
            last_progress: None,
            fps,
            last_fps_report: None,
            event_tx: None,
        }
    }

    /// Set the event sender for host notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: EngineEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                debug!("Failed to send engine event: receiver dropped");
            }
        }
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Running or still rolling to a stop
    #[inline]
    pub fn is_scrolling(&self) -> bool {
        self.phase != EnginePhase::Idle
    }

    /// Speed actually applied on the last frame (0 when idle)
    pub fn current_speed(&self) -> f64 {
        self.runtime.as_ref().map(|r| r.current_speed).unwrap_or(0.0)
    }

    pub fn is_frame_scheduled(&self) -> bool {
        self.runtime.as_ref().is_some_and(|r| r.scheduled.is_some())
    }

    /// Time until the scheduled frame is due, `None` when nothing is scheduled
    pub fn next_frame_in(&self, now: Instant) -> Option<Duration> {
        let runtime = self.runtime.as_ref()?;
        runtime.scheduled?;
        Some(match runtime.last_frame {
            Some(last) => (last + self.settings.frame_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn user_scrolled(&self) -> bool {
        self.detector.user_scrolled()
    }

    pub fn direction(&self) -> ScrollDirection {
        self.detector.direction()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_processing_font_change(&self) -> bool {
        self.reconciler.is_processing_change()
    }

    pub fn wake_lock_mode(&self) -> WakeLockMode {
        self.wake_lock.mode()
    }

    pub fn wake_lock_active(&self) -> bool {
        self.wake_lock.is_active()
    }

    /// Last wake lock problem, for a non-blocking warning
    pub fn wake_lock_error(&self) -> Option<&WakeLockError> {
        self.wake_lock.last_error()
    }

    fn is_scrollable(&self) -> bool {
        content_scrollable(self.viewport.content_height(), self.viewport.viewport_height())
    }

    /// Begin auto-scrolling
    ///
    /// No-op if already running or the content fits the viewport. A fatal
    /// wake lock failure is returned and the engine stays idle.
    pub async fn start(&mut self) -> Result<()> {
        match self.phase {
            EnginePhase::Running => return Ok(()),
            EnginePhase::Decelerating => {
                self.resume();
                return Ok(());
            }
            EnginePhase::Idle => {}
        }

        if !self.is_scrollable() {
            debug!("Content fits the viewport, not starting");
            self.state.depth = 0.0;
            self.state.is_running = false;
            return Ok(());
        }

        self.wake_lock.acquire().await?;
        if let Some(WakeLockError::Unsupported) = self.wake_lock.last_error() {
            self.send_event(EngineEvent::WakeLockWarning {
                message: WakeLockError::Unsupported.to_string(),
            });
        }

        self.end_turn();
        self.detector.reset_user_scrolled();
        self.state.position = self.viewport.position();
        self.runtime = Some(EngineRuntime {
            current_speed: self.state.speed_setting,
            last_frame: None,
            is_decelerating: false,
            scheduled: None,
        });
        self.phase = EnginePhase::Running;
        self.state.is_running = true;
        self.last_progress = None;
        self.schedule_frame();

        info!(
            speed = self.state.speed_setting,
            position = self.state.position,
            wake_lock = ?self.wake_lock.mode(),
            "Auto-scroll started"
        );
        self.send_event(EngineEvent::Started);
        Ok(())
    }

    fn resume(&mut self) {
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.is_decelerating = false;
        }
        self.phase = EnginePhase::Running;
        debug!("Deceleration cancelled, resuming");
        self.send_event(EngineEvent::Started);
    }

    /// Roll to a stop; the wake lock is released once speed has decayed
    pub fn stop(&mut self) {
        if self.phase != EnginePhase::Running {
            return;
        }
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.is_decelerating = true;
        }
        self.phase = EnginePhase::Decelerating;
        debug!(speed = self.current_speed(), "Decelerating");
    }

    /// Start when idle, stop when running, resume when decelerating
    pub async fn toggle(&mut self) -> Result<()> {
        match self.phase {
            EnginePhase::Running => {
                self.stop();
                Ok(())
            }
            EnginePhase::Idle | EnginePhase::Decelerating => self.start().await,
        }
    }

    /// Stop immediately without deceleration
    pub fn halt(&mut self) {
        self.finalize();
    }

    /// Teardown: cancel the outstanding frame and release the wake lock
    pub fn shutdown(&mut self) {
        self.finalize();
        self.wake_lock.release();
    }

    fn finalize(&mut self) {
        if self.runtime.is_none() && self.phase == EnginePhase::Idle {
            return;
        }
        self.runtime = None;
        self.phase = EnginePhase::Idle;
        self.state.is_running = false;
        self.wake_lock.release();
        if let Some(fps) = self.fps.as_mut() {
            fps.pause();
        }
        info!(position = self.state.position, depth = self.state.depth, "Auto-scroll stopped");
        self.send_event(EngineEvent::Progress { depth: self.state.depth });
        self.send_event(EngineEvent::Stopped);
    }

    fn schedule_frame(&mut self) {
        if let Some(runtime) = self.runtime.as_mut() {
            self.next_ticket = self.next_ticket.wrapping_add(1);
            runtime.scheduled = Some(FrameTicket(self.next_ticket));
        }
    }

    /// Change the speed setting; takes effect on the next frame
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.state.speed_setting = clamp_speed(speed);
        self.state.speed_setting
    }

    pub fn adjust_speed(&mut self, delta: f64) -> f64 {
        self.set_speed(self.state.speed_setting + delta)
    }

    /// Scheduler turn boundary; clears one-shot marks whose event never came
    pub fn end_turn(&mut self) {
        self.detector.end_turn();
        self.reconciler.end_turn();
    }

    /// Process the scheduled frame, if any
    pub fn on_frame(&mut self, now: Instant) -> FrameOutcome {
        let Some(runtime) = self.runtime.as_mut() else {
            return FrameOutcome::NotScheduled;
        };
        if runtime.scheduled.take().is_none() {
            return FrameOutcome::NotScheduled;
        }

        self.end_turn();

        if !self.visible || self.reconciler.is_processing_change() {
            if let Some(runtime) = self.runtime.as_mut() {
                runtime.last_frame = Some(now);
            }
            if let Some(fps) = self.fps.as_mut() {
                fps.pause();
            }
            self.schedule_frame();
            return FrameOutcome::Skipped;
        }

        self.record_fps(now);

        let content_height = self.viewport.content_height();
        let viewport_height = self.viewport.viewport_height();
        if !content_scrollable(content_height, viewport_height) {
            info!(content_height, viewport_height, "Content no longer scrollable, stopping");
            self.state.depth = 0.0;
            self.finalize();
            return FrameOutcome::Stopped;
        }

        let max = max_scroll(content_height, viewport_height);
        let frame_interval = self.settings.frame_interval;
        let max_delta = self.settings.max_frame_delta;
        let damping = self.settings.damping_factor;
        let epsilon = self.settings.stop_epsilon;
        let speed_setting = self.state.speed_setting;

        let (speed, elapsed, decelerating) = {
            let Some(runtime) = self.runtime.as_mut() else {
                return FrameOutcome::NotScheduled;
            };
            let elapsed = match runtime.last_frame {
                Some(last) => now.saturating_duration_since(last),
                None => frame_interval,
            }
            .min(max_delta);
            runtime.last_frame = Some(now);

            if runtime.is_decelerating {
                runtime.current_speed *= damping;
            } else {
                runtime.current_speed = speed_setting;
            }
            (runtime.current_speed, elapsed, runtime.is_decelerating)
        };

        if decelerating && speed < epsilon {
            self.finalize();
            return FrameOutcome::Stopped;
        }

        let delta = delta_for_frame(speed, elapsed.as_secs_f64() * 1000.0, self.settings.base_rate);
        let position = clamp_position(self.state.position + delta, max);

        self.detector.mark_engine_scroll();
        self.viewport.set_position(position);
        self.state.position = position;
        self.state.depth = depth_from_position(position, content_height, viewport_height);
        self.emit_progress_throttled(now);

        if !decelerating && self.detector.check_at_end(position, max) {
            info!(position, max_scroll = max, "Reached end of content");
            self.send_event(EngineEvent::Completed);
            self.finalize();
            return FrameOutcome::Completed;
        }

        self.schedule_frame();
        FrameOutcome::Advanced { position }
    }

    fn emit_progress_throttled(&mut self, now: Instant) {
        let due = match self.last_progress {
            Some(last) => now.saturating_duration_since(last) >= self.settings.progress_interval,
            None => true,
        };
        if due {
            self.last_progress = Some(now);
            self.send_event(EngineEvent::Progress { depth: self.state.depth });
        }
    }

    fn record_fps(&mut self, now: Instant) {
        let Some(fps) = self.fps.as_mut() else {
            return;
        };
        fps.record(now);
        let due = match self.last_fps_report {
            Some(last) => now.saturating_duration_since(last) >= self.settings.fps_report_interval,
            None => false,
        };
        if self.last_fps_report.is_none() || due {
            if due {
                let report = fps.report();
                debug!(
                    average_fps = report.average_fps,
                    worst_frame_ms = report.worst_frame.as_millis() as u64,
                    dropped = report.dropped_frames,
                    samples = report.samples,
                    "Frame timing"
                );
            }
            self.last_fps_report = Some(now);
        }
    }

    /// Forward a viewport scroll event (the passive listener)
    pub fn handle_scroll_event(&mut self, position: f64, now: Instant) -> ScrollObservation {
        let content_height = self.viewport.content_height();
        let viewport_height = self.viewport.viewport_height();

        if self.reconciler.is_processing_change() {
            // Reflow clamping or the reconciler's own restore write
            let observation = self.detector.observe(position, false, now);
            self.state.position = position;
            self.state.depth = depth_from_position(position, content_height, viewport_height);
            return observation;
        }

        let running = self.phase != EnginePhase::Idle;
        let observation = self.detector.observe(position, running, now);
        match observation.origin {
            ScrollOrigin::Engine => {}
            ScrollOrigin::User => {
                self.state.position = position;
                self.state.depth = depth_from_position(position, content_height, viewport_height);
                if observation.notify {
                    self.send_event(EngineEvent::UserInterrupted);
                }
                info!(position, "Manual scroll, pausing playback");
                self.finalize();
            }
            ScrollOrigin::Idle => {
                self.state.position = position;
                self.state.depth = depth_from_position(position, content_height, viewport_height);
                self.emit_progress_throttled(now);
            }
        }
        observation
    }

    /// Forward a scroll event the layout caused, such as a resize clamping the offset
    ///
    /// Only syncs the reading position; never interrupts playback.
    pub fn handle_layout_scroll(&mut self, position: f64) {
        let content_height = self.viewport.content_height();
        let viewport_height = self.viewport.viewport_height();
        self.detector.sync_position(position);
        self.state.position = position;
        self.state.depth = depth_from_position(position, content_height, viewport_height);
        debug!(position, "Layout moved the scroll offset");
    }

    /// Host visibility changed (tab hidden, window lost focus, ...)
    pub async fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        debug!(visible, "Visibility changed");

        if visible {
            // Resume from here; hidden wall-clock time must not become a jump
            if let Some(runtime) = self.runtime.as_mut() {
                runtime.last_frame = None;
            }
        }

        self.wake_lock.on_visibility_change(visible).await;

        if visible {
            if let Some(e @ WakeLockError::ReacquireFailed(_)) = self.wake_lock.last_error() {
                warn!(error = %e, "Playback continues without wake lock");
                let message = e.to_string();
                self.send_event(EngineEvent::WakeLockWarning { message });
            }
        }
    }

    /// Report a new font size; call before the host lays out with it
    pub fn set_font_size(&mut self, font_size: f64) {
        let changed = self.reconciler.on_font_size(
            font_size,
            self.state.position,
            self.viewport.content_height(),
            self.viewport.viewport_height(),
        );
        if changed {
            self.state.font_size = font_size;
        }
    }

    /// Layout pass finished; restores the reading ratio once a font change settles
    pub fn handle_layout(&mut self) {
        let content_height = self.viewport.content_height();
        let viewport_height = self.viewport.viewport_height();

        if let Some(position) = self.reconciler.on_layout(content_height, viewport_height) {
            self.write_position(position);
            return;
        }
        if self.reconciler.is_processing_change() {
            return;
        }

        if !content_scrollable(content_height, viewport_height) {
            self.state.depth = 0.0;
            if self.phase != EnginePhase::Idle {
                info!(content_height, viewport_height, "Content no longer scrollable, stopping");
                self.finalize();
            }
            return;
        }

        let max = max_scroll(content_height, viewport_height);
        self.state.position = clamp_position(self.state.position, max);
        self.state.depth = depth_from_position(self.state.position, content_height, viewport_height);
    }

    /// Jump back to the top of the content
    pub fn reset_position(&mut self) {
        self.write_position(0.0);
    }

    /// Jump to a depth ratio (e.g. restoring saved progress)
    pub fn jump_to_depth(&mut self, depth: f64) {
        let position = position_from_depth(
            depth,
            self.viewport.content_height(),
            self.viewport.viewport_height(),
        );
        self.write_position(position);
    }

    /// Flagged write of a non-frame position change
    fn write_position(&mut self, position: f64) {
        let content_height = self.viewport.content_height();
        let viewport_height = self.viewport.viewport_height();
        let position = clamp_position(position, max_scroll(content_height, viewport_height));

        self.detector.mark_engine_scroll();
        self.viewport.set_position(position);
        self.state.position = position;
        self.state.depth = depth_from_position(position, content_height, viewport_height);
        self.last_progress = None;
        self.emit_progress_throttled(Instant::now());
    }
}

impl<V: Viewport> Drop for ScrollEngine<V> {
    fn drop(&mut self) {
        self.runtime = None;
        self.wake_lock.release();
    }
}
