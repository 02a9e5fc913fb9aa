use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use prompter_core::scroll::EnginePhase;

use crate::app::App;

pub struct StatusBarWidget;

impl StatusBarWidget {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = &app.theme;
        let state = app.engine.state();

        let (mode_str, mode_color) = match app.engine.phase() {
            EnginePhase::Running => ("PLAYING", theme.playing),
            EnginePhase::Decelerating => ("STOPPING", theme.paused),
            EnginePhase::Idle if app.completed => ("END", theme.accent),
            EnginePhase::Idle => ("PAUSED", theme.paused),
        };

        let mut spans = vec![
            Span::styled(
                format!(" {} ", mode_str),
                Style::default()
                    .fg(theme.bg0)
                    .bg(mode_color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    " {} | {:.2}x | {}px | {:>3.0}% ",
                    app.title,
                    state.speed_setting,
                    state.font_size,
                    state.depth * 100.0
                ),
                Style::default().fg(theme.fg0).bg(theme.bg2),
            ),
        ];

        if let Some(warning) = &app.wake_lock_warning {
            spans.push(Span::styled(
                format!(" ! {} ", warning),
                Style::default().fg(theme.warning).bg(theme.bg2),
            ));
        }

        if let Some(msg) = &app.status_message {
            spans.push(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(theme.accent).bg(theme.bg2),
            ));
        }

        let help_hint = " space:play ↑/↓:speed +/-:font 0:top q:quit ";
        let used: usize = spans.iter().map(|s| s.width()).sum();
        let padding_len = (area.width as usize).saturating_sub(used + help_hint.chars().count());

        spans.push(Span::styled(
            " ".repeat(padding_len),
            Style::default().bg(theme.bg2),
        ));
        spans.push(Span::styled(
            help_hint,
            Style::default().fg(theme.grey1).bg(theme.bg2),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
