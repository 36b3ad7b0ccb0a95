//! NowPlaying component — the whole screen.
//!
//! Loading: a centered spinner until the first status arrives.
//! Loaded, top to bottom:
//!   artwork box (spinner / half-block image / ⚠)
//!   `Playing: <title>`
//!   source label and start time
//!   play/pause control (clickable)
//!   recent history
//!   key hints (bottom row)

use chrono::Local;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    action::Action,
    app_state::AppState,
    artwork::{ArtworkPhase, ArtworkView, ART_COLS, ART_ROWS},
    component::Component,
    theme::{
        style_control, style_muted, style_secondary, style_title, C_ART_FRAME, C_BG, C_LIVE,
        C_MUTED, C_WARNING,
    },
};

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const HISTORY_ROWS: usize = 5;

pub fn spinner(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

/// Cut `s` to at most `max` display columns, marking the cut with `…`.
fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[derive(Default)]
pub struct NowPlaying {
    /// Where the control was last drawn; empty until the first loaded frame.
    control_area: Rect,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw_loading(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let [row] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        let line = Line::from(vec![
            Span::styled(spinner(state.spinner_frame), style_control()),
            Span::styled("  tuning in", style_secondary()),
        ]);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), row);
    }

    fn draw_artwork(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let [boxed] = Layout::horizontal([Constraint::Length(ART_COLS + 2)])
            .flex(Flex::Center)
            .areas(area);
        let block = Block::bordered().border_style(Style::default().fg(C_ART_FRAME));
        let inner = block.inner(boxed);
        frame.render_widget(block, boxed);

        match &state.artwork {
            ArtworkPhase::Success(art) => {
                frame.render_widget(ArtworkView::new(art), inner);
            }
            ArtworkPhase::Empty => {
                let [mid] = Layout::vertical([Constraint::Length(1)])
                    .flex(Flex::Center)
                    .areas(inner);
                let p = Paragraph::new(Span::styled(spinner(state.spinner_frame), style_muted()))
                    .alignment(Alignment::Center);
                frame.render_widget(p, mid);
            }
            ArtworkPhase::Failure => {
                let [mid] = Layout::vertical([Constraint::Length(1)])
                    .flex(Flex::Center)
                    .areas(inner);
                let p = Paragraph::new(Span::styled(
                    "⚠",
                    Style::default().fg(C_WARNING),
                ))
                .alignment(Alignment::Center);
                frame.render_widget(p, mid);
            }
        }
    }
}

impl Component for NowPlaying {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                vec![Action::Quit]
            }
            // no control on screen until the first status
            KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter if state.status.is_none() => {
                vec![]
            }
            KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter => {
                vec![Action::TogglePlayback]
            }
            KeyCode::Char('q') | KeyCode::Esc => vec![Action::Quit],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, state: &AppState) -> Vec<Action> {
        if state.status.is_none() {
            return vec![];
        }
        if let MouseEventKind::Down(MouseButton::Left) = event.kind {
            if self
                .control_area
                .contains(Position::new(event.column, event.row))
            {
                return vec![Action::TogglePlayback];
            }
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let Some(status) = state.status.as_deref() else {
            self.control_area = Rect::default();
            self.draw_loading(frame, area, state);
            return;
        };

        let history_len = status.history.len().min(HISTORY_ROWS) as u16;
        let [art, _, title, source, _, control, _, history, _, hints] = Layout::vertical([
            Constraint::Length(ART_ROWS + 2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(if history_len > 0 { history_len + 1 } else { 0 }),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        self.draw_artwork(frame, art, state);

        let width = usize::from(area.width);
        let title_text = truncate_to_width(&status.display_title(), width);
        frame.render_widget(
            Paragraph::new(Span::styled(title_text, style_title())).alignment(Alignment::Center),
            title,
        );

        // ● live · collaborator · since 14:03
        let dot_color = if status.is_online() { C_LIVE } else { C_MUTED };
        let mut meta = status.source.label();
        if let Some(started) = status.current_track.started_at() {
            meta.push_str(&format!(
                " · since {}",
                started.with_timezone(&Local).format("%H:%M")
            ));
        }
        let meta_line = Line::from(vec![
            Span::styled("● ", Style::default().fg(dot_color)),
            Span::styled(truncate_to_width(&meta, width.saturating_sub(2)), style_muted()),
        ]);
        frame.render_widget(Paragraph::new(meta_line).alignment(Alignment::Center), source);

        let label = if state.is_playing { "⏸ pause" } else { "▶ play" };
        let label_width = label.width() as u16 + 4;
        let [button] = Layout::horizontal([Constraint::Length(label_width)])
            .flex(Flex::Center)
            .areas(control);
        frame.render_widget(
            Paragraph::new(Span::styled(label, style_control())).alignment(Alignment::Center),
            button,
        );
        self.control_area = button;

        if history_len > 0 {
            let mut lines = vec![Line::from(Span::styled("previously", style_secondary()))];
            lines.extend(status.history.iter().take(HISTORY_ROWS).map(|t| {
                Line::from(Span::styled(
                    truncate_to_width(&t.title, width.saturating_sub(2)),
                    style_muted(),
                ))
            }));
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), history);
        }

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("space", style_secondary()),
                Span::styled(" play/pause   ", style_muted()),
                Span::styled("q", style_secondary()),
                Span::styled(" quit", style_muted()),
            ]))
            .alignment(Alignment::Center),
            hints,
        );
    }
}
