//! Host viewport seam
//!
//! The engine never owns layout. It reads measurements and writes the
//! scroll offset through this trait; the host forwards every resulting
//! scroll event back via `ScrollEngine::handle_scroll_event`.

/// A read-only text viewport that can be scrolled vertically
pub trait Viewport {
    /// Current scroll offset in pixels
    fn position(&self) -> f64;

    /// Write a new scroll offset in pixels
    fn set_position(&mut self, position: f64);

    /// Full height of the laid-out content
    fn content_height(&self) -> f64;

    /// Height of the visible area
    fn viewport_height(&self) -> f64;

    /// Maximum reachable offset for the current layout
    fn max_scroll(&self) -> f64 {
        super::math::max_scroll(self.content_height(), self.viewport_height())
    }
}

/// In-memory viewport used by tests and headless hosts
///
/// Records every position change as a pending scroll event, the way a
/// real scroll container would fire one after a programmatic write.
#[derive(Debug, Clone, Default)]
pub struct MemoryViewport {
    position: f64,
    content_height: f64,
    viewport_height: f64,
    events: Vec<f64>,
}

impl MemoryViewport {
    pub fn new(content_height: f64, viewport_height: f64) -> Self {
        Self {
            position: 0.0,
            content_height,
            viewport_height,
            events: Vec::new(),
        }
    }

    /// Change the layout (e.g. after a reflow); clamps the offset like a browser would
    pub fn resize(&mut self, content_height: f64, viewport_height: f64) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        let clamped = super::math::clamp_position(self.position, self.max_scroll());
        if clamped != self.position {
            self.position = clamped;
            self.events.push(clamped);
        }
    }

    /// Simulate the user dragging the scroll position
    pub fn user_scroll_to(&mut self, position: f64) {
        self.set_position(position);
    }

    /// Drain scroll events fired since the last call
    pub fn take_events(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.events)
    }
}

impl Viewport for MemoryViewport {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        let clamped = super::math::clamp_position(position, self.max_scroll());
        if clamped != self.position {
            self.position = clamped;
            self.events.push(clamped);
        }
    }

    fn content_height(&self) -> f64 {
        self.content_height
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }
}
