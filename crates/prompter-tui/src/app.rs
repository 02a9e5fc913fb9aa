use std::sync::Arc;
use std::time::{Duration, Instant};

use prompter_core::scroll::{EngineEvent, EnginePhase, EngineSettings, ScrollEngine, Viewport};
use prompter_core::wake_lock::WakeLockController;
use prompter_core::{AppConfig, ProgressSaver};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::input::Action;
use crate::theme::Theme;
use crate::viewport::{TextViewport, USER_SCROLL_ROWS};

/// How long a status message stays in the status bar
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Application state
pub struct App {
    pub config: Arc<AppConfig>,
    pub theme: Theme,
    /// Script name shown in the status bar
    pub title: String,
    pub engine: ScrollEngine<TextViewport>,
    engine_events: mpsc::UnboundedReceiver<EngineEvent>,
    progress: Option<ProgressSaver>,
    /// Saved depth to jump to once the script has been laid out
    pending_restore: Option<f64>,
    pub status_message: Option<String>,
    status_since: Option<Instant>,
    /// Persistent wake lock problem, shown until playback restarts cleanly
    pub wake_lock_warning: Option<String>,
    /// End of the script was reached
    pub completed: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: Arc<AppConfig>,
        title: impl Into<String>,
        text: &str,
        wake_lock: WakeLockController,
        progress: Option<ProgressSaver>,
    ) -> Self {
        let display = &config.display;
        let font_size = display.font_size;
        let viewport = TextViewport::new(text, font_size, display.line_height);

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = ScrollEngine::new(
            viewport,
            wake_lock,
            EngineSettings::from_config(&config),
            config.scroll.default_speed,
            font_size,
        )
        .with_event_sender(tx);

        let pending_restore = progress
            .as_ref()
            .and_then(|p| p.saved())
            .map(|p| p.depth)
            .filter(|depth| *depth > 0.0);

        Self {
            config,
            theme: Theme::default(),
            title: title.into(),
            engine,
            engine_events: rx,
            progress,
            pending_restore,
            status_message: None,
            status_since: None,
            wake_lock_warning: None,
            completed: false,
            should_quit: false,
        }
    }

    /// Set a temporary status message
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_since = Some(Instant::now());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
        self.status_since = None;
    }

    /// Expire old status messages
    pub fn tick(&mut self, now: Instant) {
        if let Some(since) = self.status_since {
            if now.saturating_duration_since(since) >= STATUS_TTL {
                self.clear_status();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.engine.phase() == EnginePhase::Running
    }

    /// Deliver viewport scroll events to the engine, like a passive scroll listener
    pub fn dispatch_scroll_events(&mut self, now: Instant) {
        for position in self.engine.viewport_mut().take_events() {
            self.engine.handle_scroll_event(position, now);
        }
    }

    /// Run the scheduled engine frame, if any
    pub fn on_frame(&mut self, now: Instant) {
        self.engine.on_frame(now);
        self.dispatch_scroll_events(now);
    }

    /// Lay out the script for the script area; called while drawing
    pub fn layout(&mut self, width: u16, height: u16) {
        self.engine.viewport_mut().layout(width, height);
    }

    /// Layout pass finished: reconcile font changes and apply a pending restore
    pub fn after_layout(&mut self, now: Instant) {
        // Clamps from a resize or reflow are not the reader scrolling
        for position in self.engine.viewport_mut().take_layout_events() {
            self.engine.handle_layout_scroll(position);
        }
        self.dispatch_scroll_events(now);
        self.engine.handle_layout();
        self.dispatch_scroll_events(now);

        if let Some(depth) = self.pending_restore {
            let viewport = self.engine.viewport();
            if viewport.is_laid_out() && viewport.max_scroll() > 0.0 {
                info!(depth, "Restoring saved reading position");
                self.engine.jump_to_depth(depth);
                self.dispatch_scroll_events(now);
                self.pending_restore = None;
            }
        }

        self.engine.end_turn();
    }

    /// Drain engine notifications
    pub fn process_engine_events(&mut self, now: Instant) {
        while let Ok(event) = self.engine_events.try_recv() {
            match event {
                EngineEvent::Started => {
                    self.completed = false;
                    if self.engine.wake_lock_error().is_none() {
                        self.wake_lock_warning = None;
                    }
                }
                EngineEvent::Progress { depth } => {
                    let state = *self.engine.state();
                    if let Some(saver) = self.progress.as_mut() {
                        saver.update(depth, state.position, state.font_size, now);
                    }
                }
                EngineEvent::Completed => {
                    self.completed = true;
                    self.set_status("End of script");
                }
                EngineEvent::Stopped => {
                    // Updates inside the save interval are still pending
                    if let Some(saver) = self.progress.as_mut() {
                        saver.flush();
                    }
                }
                EngineEvent::UserInterrupted => {
                    self.set_status("Paused: manual scroll");
                }
                EngineEvent::WakeLockWarning { message } => {
                    self.wake_lock_warning = Some(message);
                }
            }
        }
    }

    pub async fn set_visible(&mut self, visible: bool) {
        self.engine.set_visible(visible).await;
    }

    /// Apply an input action
    pub async fn handle_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::TogglePlayback => {
                if let Err(e) = self.engine.toggle().await {
                    warn!(error = %e, "Could not start playback");
                    self.set_status(format!("Cannot start: {}", e));
                }
            }
            Action::SpeedUp => self.change_speed(self.config.scroll.speed_step),
            Action::SpeedDown => self.change_speed(-self.config.scroll.speed_step),
            Action::ResetPosition => {
                self.engine.reset_position();
                self.completed = false;
            }
            Action::FontLarger => self.change_font(self.config.display.font_step),
            Action::FontSmaller => self.change_font(-self.config.display.font_step),
            Action::ScrollUp => self.engine.viewport_mut().scroll_rows(-USER_SCROLL_ROWS),
            Action::ScrollDown => self.engine.viewport_mut().scroll_rows(USER_SCROLL_ROWS),
            Action::PageUp => {
                let rows = self.page_rows();
                self.engine.viewport_mut().scroll_rows(-rows);
            }
            Action::PageDown => {
                let rows = self.page_rows();
                self.engine.viewport_mut().scroll_rows(rows);
            }
            Action::None => {}
        }
        self.dispatch_scroll_events(now);
    }

    fn page_rows(&self) -> i32 {
        let viewport = self.engine.viewport();
        let rows = (viewport.viewport_height() / viewport.line_px()).floor() as i32;
        (rows - 1).max(1)
    }

    fn change_speed(&mut self, delta: f64) {
        let speed = self.engine.adjust_speed(delta);
        self.set_status(format!("Speed {:.2}x", speed));
    }

    fn change_font(&mut self, delta: f64) {
        let display = &self.config.display;
        let current = self.engine.state().font_size;
        let font_size = (current + delta).clamp(display.min_font_size, display.max_font_size);
        if font_size == current {
            return;
        }
        // Reconciler first: it must see the layout of the old size
        self.engine.set_font_size(font_size);
        self.engine.viewport_mut().set_font_size(font_size);
        self.set_status(format!("Font {}px", font_size));
    }

    /// Stop playback, release the wake lock and write any pending progress
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        let state = *self.engine.state();
        if let Some(saver) = self.progress.as_mut() {
            saver.update(state.depth, state.position, state.font_size, Instant::now());
            saver.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompter_core::ProgressStore;

    fn script() -> String {
        (0..200)
            .map(|i| format!("Line {} of the script, long enough to wrap on a narrow terminal window.", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        let mut app = App::new(
            Arc::new(AppConfig::default()),
            "test",
            &script(),
            WakeLockController::unsupported(),
            None,
        );
        app.layout(100, 20);
        app.after_layout(Instant::now());
        app
    }

    /// One iteration of the host loop at `now`
    fn step(app: &mut App, now: Instant) {
        app.on_frame(now);
        app.layout(100, 20);
        app.after_layout(now);
        app.process_engine_events(now);
    }

    #[tokio::test]
    async fn test_toggle_plays_and_scrolls() {
        let mut app = app();
        let t0 = Instant::now();
        app.handle_action(Action::TogglePlayback, t0).await;
        assert!(app.is_playing());

        for i in 1..=30 {
            step(&mut app, t0 + Duration::from_millis(16 * i));
        }
        assert!(app.engine.state().position > 0.0);
        assert!(app.is_playing());
        // Unsupported wake lock is surfaced but does not block playback
        app.process_engine_events(t0);
        assert!(app.wake_lock_warning.is_some());
    }

    #[tokio::test]
    async fn test_manual_scroll_pauses() {
        let mut app = app();
        let t0 = Instant::now();
        app.handle_action(Action::TogglePlayback, t0).await;
        step(&mut app, t0);

        app.handle_action(Action::ScrollDown, t0 + Duration::from_millis(16)).await;
        app.process_engine_events(t0);
        assert!(!app.engine.is_scrolling());
        assert_eq!(app.status_message.as_deref(), Some("Paused: manual scroll"));
    }

    #[tokio::test]
    async fn test_resize_does_not_pause() {
        let mut app = app();
        let t0 = Instant::now();
        app.engine.jump_to_depth(0.99);
        app.dispatch_scroll_events(t0);
        app.handle_action(Action::TogglePlayback, t0).await;
        step(&mut app, t0);

        // Taller terminal near the end clamps the offset
        let now = t0 + Duration::from_millis(16);
        app.layout(100, 40);
        app.after_layout(now);
        app.process_engine_events(now);

        assert!(app.is_playing());
        assert!(!app.engine.user_scrolled());
        assert_ne!(app.status_message.as_deref(), Some("Paused: manual scroll"));
        let viewport = app.engine.viewport();
        assert_eq!(app.engine.state().position, viewport.max_scroll());
    }

    #[tokio::test]
    async fn test_stop_flushes_progress() {
        let path = std::env::temp_dir()
            .join(format!("prompter-tui-test-{}", uuid::Uuid::new_v4()))
            .join("progress.json");
        let saver = ProgressSaver::new(
            ProgressStore::load(&path),
            "script",
            Duration::from_secs(60),
        );
        let mut app = App::new(
            Arc::new(AppConfig::default()),
            "test",
            &script(),
            WakeLockController::unsupported(),
            Some(saver),
        );
        app.layout(100, 20);
        app.after_layout(Instant::now());

        let t0 = Instant::now();
        app.handle_action(Action::TogglePlayback, t0).await;
        for i in 0..10 {
            step(&mut app, t0 + Duration::from_millis(16 * i));
        }
        app.engine.halt();
        app.process_engine_events(t0 + Duration::from_millis(200));

        let saver = app.progress.as_ref().unwrap();
        assert!(!saver.is_dirty());
        let saved = ProgressStore::load(&path).get("script").unwrap().depth;
        assert_eq!(saved, app.engine.state().depth);
        assert!(saved > 0.0);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_speed_keys_clamp() {
        let mut app = app();
        let now = Instant::now();
        for _ in 0..40 {
            app.handle_action(Action::SpeedUp, now).await;
        }
        assert_eq!(app.engine.state().speed_setting, 5.0);
        for _ in 0..40 {
            app.handle_action(Action::SpeedDown, now).await;
        }
        assert_eq!(app.engine.state().speed_setting, 0.0);
    }

    #[tokio::test]
    async fn test_font_change_keeps_reading_ratio() {
        let mut app = app();
        let now = Instant::now();
        app.engine.jump_to_depth(0.5);
        app.dispatch_scroll_events(now);
        let depth = app.engine.state().depth;

        for _ in 0..4 {
            app.handle_action(Action::FontLarger, now).await;
        }
        for _ in 0..4 {
            step(&mut app, now);
        }

        assert_eq!(app.engine.state().font_size, 36.0);
        assert!(!app.engine.is_processing_font_change());
        assert!((app.engine.state().depth - depth).abs() < 0.01);
        assert!(!app.engine.user_scrolled());
    }

    #[tokio::test]
    async fn test_font_limits() {
        let mut app = app();
        let now = Instant::now();
        for _ in 0..100 {
            app.handle_action(Action::FontSmaller, now).await;
        }
        assert_eq!(app.engine.state().font_size, app.config.display.min_font_size);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app();
        app.handle_action(Action::Quit, Instant::now()).await;
        assert!(app.should_quit);
        app.shutdown();
        assert!(!app.engine.is_scrolling());
    }

    #[test]
    fn test_status_expires() {
        let mut app = app();
        app.set_status("hello");
        let since = app.status_since.unwrap();
        app.tick(since + Duration::from_secs(1));
        assert!(app.status_message.is_some());
        app.tick(since + STATUS_TTL);
        assert!(app.status_message.is_none());
    }
}
