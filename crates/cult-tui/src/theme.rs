//! Color palette and style constants.

use ratatui::style::{Color, Modifier, Style};

pub const C_BG: Color = Color::Rgb(0, 0, 0);
/// Play/pause control, the station's signature dark red.
pub const C_ACCENT: Color = Color::Rgb(179, 0, 0);
pub const C_TITLE: Color = Color::Rgb(255, 255, 255);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_LIVE: Color = Color::Rgb(80, 200, 120);
pub const C_WARNING: Color = Color::Rgb(255, 184, 80);
pub const C_ART_FRAME: Color = Color::Rgb(40, 40, 52);

pub fn style_title() -> Style {
    Style::default()
        .fg(C_TITLE)
        .bg(C_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn style_control() -> Style {
    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
