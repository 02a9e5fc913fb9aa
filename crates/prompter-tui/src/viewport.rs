//! Terminal text viewport
//!
//! Lays out the script for the terminal and exposes it to the engine in
//! pixel units. One terminal row is one text line; a line is
//! `font_size * line_height` pixels tall. A larger font gets fewer columns
//! per line, so changing the font size reflows the script the way a
//! browser would.

use prompter_core::scroll::Viewport;
use unicode_width::UnicodeWidthChar;

/// Font size at which a line spans the full terminal width
pub const REFERENCE_FONT_SIZE: f64 = 28.0;

/// Narrowest wrap width, whatever the font size
const MIN_COLUMNS: usize = 8;

/// Rows scrolled per manual scroll step
pub const USER_SCROLL_ROWS: i32 = 3;

pub struct TextViewport {
    paragraphs: Vec<String>,
    lines: Vec<String>,
    font_size: f64,
    line_height: f64,
    /// Terminal area of the last layout
    area: Option<(u16, u16)>,
    /// Wrap width the current `lines` were built for
    wrapped_columns: Option<usize>,
    position: f64,
    events: Vec<f64>,
    /// Offset changes caused by layout clamping, kept apart from scroll writes
    layout_events: Vec<f64>,
}

impl TextViewport {
    pub fn new(text: &str, font_size: f64, line_height: f64) -> Self {
        Self {
            paragraphs: text.lines().map(|l| l.trim_end().to_string()).collect(),
            lines: Vec::new(),
            font_size,
            line_height,
            area: None,
            wrapped_columns: None,
            position: 0.0,
            events: Vec::new(),
            layout_events: Vec::new(),
        }
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Change the font size; the reflow happens on the next `layout`
    pub fn set_font_size(&mut self, font_size: f64) {
        self.font_size = font_size;
    }

    /// Pixel height of one text row
    pub fn line_px(&self) -> f64 {
        self.font_size * self.line_height
    }

    pub fn is_laid_out(&self) -> bool {
        self.area.is_some()
    }

    /// Wrap width in columns for the given terminal width at the current font size
    pub fn columns_for(&self, width: u16) -> usize {
        let scaled = width as f64 * REFERENCE_FONT_SIZE / self.font_size;
        (scaled.floor() as usize).clamp(MIN_COLUMNS.min(width as usize).max(1), (width as usize).max(1))
    }

    /// Lay out for a terminal area
    ///
    /// Re-wraps when the width or font size changed and clamps the offset
    /// like a scroll container would, queueing a layout event if it moved.
    ///
    /// # Returns
    /// `true` if the content was re-wrapped
    pub fn layout(&mut self, width: u16, height: u16) -> bool {
        self.area = Some((width, height));
        let columns = self.columns_for(width);
        let rewrapped = self.wrapped_columns != Some(columns);
        if rewrapped {
            self.lines = self
                .paragraphs
                .iter()
                .flat_map(|p| wrap(p, columns))
                .collect();
            self.wrapped_columns = Some(columns);
        }

        let clamped = prompter_core::scroll::math::clamp_position(self.position, self.max_scroll());
        if clamped != self.position {
            self.position = clamped;
            self.layout_events.push(clamped);
        }
        rewrapped
    }

    /// Manual scroll by whole rows; fires a scroll event like any other write
    pub fn scroll_rows(&mut self, rows: i32) {
        let target = self.position + rows as f64 * self.line_px();
        self.set_position(target);
    }

    /// Drain scroll events fired since the last call
    pub fn take_events(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.events)
    }

    /// Drain offset changes made by `layout`
    pub fn take_layout_events(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.layout_events)
    }

    /// First visible row index
    pub fn first_row(&self) -> usize {
        let line_px = self.line_px();
        if line_px <= 0.0 {
            return 0;
        }
        (self.position / line_px).floor().max(0.0) as usize
    }

    /// Lines currently on screen
    pub fn visible_lines(&self) -> &[String] {
        let rows = self.area.map(|(_, h)| h as usize).unwrap_or(0);
        let start = self.first_row().min(self.lines.len());
        let end = (start + rows).min(self.lines.len());
        &self.lines[start..end]
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Columns the lines are wrapped to
    pub fn wrap_columns(&self) -> usize {
        self.wrapped_columns.unwrap_or(0)
    }
}

impl Viewport for TextViewport {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        let clamped = prompter_core::scroll::math::clamp_position(position, self.max_scroll());
        if clamped != self.position {
            self.position = clamped;
            self.events.push(clamped);
        }
    }

    fn content_height(&self) -> f64 {
        self.lines.len() as f64 * self.line_px()
    }

    fn viewport_height(&self) -> f64 {
        self.area.map(|(_, h)| h as f64).unwrap_or(0.0) * self.line_px()
    }
}

/// Greedy word wrap by display width; words longer than a line are split
fn wrap(paragraph: &str, columns: usize) -> Vec<String> {
    if paragraph.trim().is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in paragraph.split_whitespace() {
        let word_width: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();

        if current_width > 0 && current_width + 1 + word_width <= columns {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
            continue;
        }

        if current_width > 0 {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= columns {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        // Hard-split an overlong word
        for c in word.chars() {
            let w = c.width().unwrap_or(0);
            if current_width + w > columns && current_width > 0 {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
    }

    if current_width > 0 || !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| format!("Paragraph {} has a handful of words that need wrapping on narrow screens.", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn test_pixel_geometry() {
        let mut viewport = TextViewport::new(&script(50), 28.0, 1.5);
        viewport.layout(200, 20);
        assert_eq!(viewport.line_px(), 42.0);
        assert_eq!(viewport.viewport_height(), 20.0 * 42.0);
        assert_eq!(viewport.content_height(), viewport.line_count() as f64 * 42.0);
    }

    #[test]
    fn test_larger_font_reflows_taller() {
        let mut viewport = TextViewport::new(&script(50), 28.0, 1.5);
        viewport.layout(80, 20);
        let before = viewport.content_height();

        viewport.set_font_size(56.0);
        assert!(viewport.layout(80, 20));
        assert_eq!(viewport.wrap_columns(), 40);
        assert!(viewport.content_height() > before);

        // Same area and font: no re-wrap
        assert!(!viewport.layout(80, 20));
    }

    #[test]
    fn test_set_position_fires_events() {
        let mut viewport = TextViewport::new(&script(50), 28.0, 1.5);
        viewport.layout(80, 10);
        viewport.set_position(100.0);
        viewport.set_position(100.0);
        assert_eq!(viewport.take_events(), vec![100.0]);

        viewport.scroll_rows(-USER_SCROLL_ROWS);
        assert_eq!(viewport.position(), 0.0);
        assert_eq!(viewport.take_events(), vec![0.0]);
    }

    #[test]
    fn test_layout_clamps_offset() {
        let mut viewport = TextViewport::new(&script(50), 28.0, 1.5);
        viewport.layout(80, 10);
        viewport.set_position(viewport.max_scroll());
        viewport.take_events();

        // Taller terminal: less to scroll
        viewport.layout(80, 30);
        assert!(viewport.take_events().is_empty());
        let events = viewport.take_layout_events();
        assert_eq!(events.len(), 1);
        assert_eq!(viewport.position(), viewport.max_scroll());
    }

    #[test]
    fn test_visible_lines_follow_position() {
        let mut viewport = TextViewport::new(&script(50), 28.0, 1.5);
        viewport.layout(80, 5);
        assert_eq!(viewport.visible_lines().len(), 5);
        viewport.set_position(42.0 * 3.5);
        assert_eq!(viewport.first_row(), 3);
    }
}
