use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};

/// Event handler for terminal events
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Poll for the next event, waiting up to the idle tick rate
    pub fn next(&self) -> Result<Option<AppEvent>> {
        self.next_within(self.tick_rate)
    }

    /// Poll for the next event, waiting at most `timeout`
    ///
    /// Used while scrolling so the loop wakes in time for the next frame.
    pub fn next_within(&self, timeout: Duration) -> Result<Option<AppEvent>> {
        if event::poll(timeout.min(self.tick_rate))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events, ignore release events
                    // (crossterm 0.27+ sends release events on some systems)
                    if key.kind == KeyEventKind::Press {
                        Ok(Some(AppEvent::Key(key)))
                    } else {
                        Ok(None)
                    }
                }
                Event::Mouse(mouse) => Ok(Some(AppEvent::Mouse(mouse))),
                Event::Resize(w, h) => Ok(Some(AppEvent::Resize(w, h))),
                Event::FocusGained => Ok(Some(AppEvent::FocusGained)),
                Event::FocusLost => Ok(Some(AppEvent::FocusLost)),
                _ => Ok(None),
            }
        } else {
            Ok(Some(AppEvent::Tick))
        }
    }
}

/// Application events
#[derive(Debug)]
pub enum AppEvent {
    /// A key was pressed
    Key(KeyEvent),
    /// Mouse input (only the wheel is used)
    Mouse(MouseEvent),
    /// Terminal was resized
    Resize(u16, u16),
    /// Terminal window became visible/focused
    FocusGained,
    /// Terminal window was hidden or lost focus
    FocusLost,
    /// No input before the timeout
    Tick,
}
