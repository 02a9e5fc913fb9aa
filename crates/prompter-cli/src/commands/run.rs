use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tracing::info;

use prompter_core::{wake_lock::WakeLockController, AppConfig, ProgressSaver, ProgressStore};
use prompter_tui::{
    app::App,
    event::{AppEvent, EventHandler},
    input::{handle_key_event, handle_mouse_event},
    keymap::Keymap,
    widgets::{ScriptViewWidget, StatusBarWidget},
};

pub async fn run(
    config: Arc<AppConfig>,
    file: &Path,
    speed: Option<f64>,
    font_size: Option<f64>,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read script {}", file.display()))?;
    let config = with_overrides(&config, speed, font_size);

    let keymap = Keymap::from_config(&config.keymap);
    let wake_lock = WakeLockController::from_config(&config.wake_lock);

    let progress = config.progress.enabled.then(|| {
        ProgressSaver::new(
            ProgressStore::load(config.progress_path()),
            ProgressStore::key_for(file),
            Duration::from_millis(config.progress.save_interval_ms),
        )
    });

    let title = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    info!(script = %file.display(), lines = text.lines().count(), "Opening script");

    let mut app = App::new(config.clone(), title.clone(), &text, wake_lock, progress);
    let event_handler = EventHandler::new(config.display.tick_rate_ms);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange,
        SetTitle(format!("Prompter - {}", title))
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = main_loop(&mut terminal, &mut app, &keymap, &event_handler).await;

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    result
}

/// Command line values win over the config file
fn with_overrides(config: &AppConfig, speed: Option<f64>, font_size: Option<f64>) -> Arc<AppConfig> {
    let mut config = config.clone();
    if let Some(speed) = speed {
        config.scroll.default_speed = speed;
    }
    if let Some(font_size) = font_size {
        config.display.font_size = font_size;
    }
    config.validate();
    Arc::new(config)
}

async fn main_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    keymap: &Keymap,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        let now = Instant::now();
        app.on_frame(now);
        app.tick(now);

        // Draw UI (lays out the script)
        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .split(frame.area());

            ScriptViewWidget::render(frame, chunks[0], app);
            StatusBarWidget::render(frame, chunks[1], app);
        })?;

        let now = Instant::now();
        app.after_layout(now);
        app.process_engine_events(now);

        // Wake up in time for the next frame while scrolling, idle otherwise
        let timeout = app
            .engine
            .next_frame_in(Instant::now())
            .unwrap_or_else(|| event_handler.tick_rate());

        if let Some(event) = event_handler.next_within(timeout)? {
            match event {
                AppEvent::Key(key) => {
                    let action = handle_key_event(key, keymap);
                    app.handle_action(action, Instant::now()).await;
                }
                AppEvent::Mouse(mouse) => {
                    let action = handle_mouse_event(mouse);
                    app.handle_action(action, Instant::now()).await;
                }
                AppEvent::Resize(_, _) => {
                    // The next draw re-lays out for the new size
                }
                AppEvent::FocusGained => app.set_visible(true).await,
                AppEvent::FocusLost => app.set_visible(false).await,
                AppEvent::Tick => {}
            }
        }
        app.process_engine_events(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
