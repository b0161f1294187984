//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::ColumnId;

pub const SLATE: Color = Color::Rgb(90, 100, 120);
pub const GOLD: Color = Color::Rgb(255, 215, 0);
pub const TEAL: Color = Color::Rgb(0, 128, 128);
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Load error banner.
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);

/// Accent color for a column's border and selected card.
pub fn column_color(column: ColumnId) -> Color {
    match column {
        ColumnId::Backlog => SLATE,
        ColumnId::Todo => GOLD,
        ColumnId::InProgress => TEAL,
        ColumnId::Review => DARK_PURPLE,
        ColumnId::Done => DARK_GREEN,
    }
}

/// Readable foreground on top of a column accent.
pub fn text_on(color: Color) -> Color {
    match color {
        GOLD => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
