use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Paragraph},
    Frame,
};

use crate::app::App;

pub struct ScriptViewWidget;

impl ScriptViewWidget {
    /// Lay out the script for `area` and draw the visible part
    pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
        app.layout(area.width, area.height);

        let theme = &app.theme;
        let viewport = app.engine.viewport();
        let columns = viewport.wrap_columns() as u16;
        // Reading line sits a third of the way down, where the eye rests
        let guide_row = (area.height / 3) as usize;

        let lines: Vec<Line> = viewport
            .visible_lines()
            .iter()
            .enumerate()
            .map(|(row, text)| {
                let style = if row == guide_row {
                    Style::default().fg(theme.fg0).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.grey2)
                };
                Line::styled(text.as_str(), style)
            })
            .collect();

        frame.render_widget(Block::default().style(Style::default().bg(theme.bg0)), area);

        // Narrower wrap at larger font sizes: center the text column
        let pad = area.width.saturating_sub(columns) / 2;
        let text_area = Rect {
            x: area.x + pad,
            width: columns.min(area.width),
            ..area
        };
        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(theme.bg0)),
            text_area,
        );
    }
}
