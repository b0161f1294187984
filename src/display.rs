//! Plain-text formatting shared by the CLI output and the TUI cards.

use chrono::{Local, NaiveDate};

use crate::board::BoardState;
use crate::task::Task;

/// Format a due date relative to today (e.g., "today", "tomorrow", "3d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Truncate to `width` characters, ending in an ellipsis when shortened.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// One-line summary of assignee, due date and priority for a card.
pub fn card_meta(task: &Task, today: NaiveDate) -> String {
    let mut parts = Vec::new();
    if let Some(assignee) = task.assignee.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("@{assignee}"));
    }
    if task.due().is_some() {
        parts.push(format_due_relative(task.due(), today));
    }
    if let Some(priority) = task.priority.as_deref().filter(|p| !p.is_empty()) {
        parts.push(priority.to_string());
    }
    parts.join(" · ")
}

/// Column counts on one line, e.g. `Backlog 1 | To-Do 2 | ...`.
pub fn summary_line(board: &BoardState) -> String {
    board
        .columns()
        .map(|(column, tasks)| format!("{} {}", column.title(), tasks.len()))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Print every column with its tasks.
pub fn print_board(board: &BoardState) {
    let today = Local::now().date_naive();
    for (column, tasks) in board.columns() {
        println!("{} ({})", column.title(), tasks.len());
        if tasks.is_empty() {
            println!("  (empty)");
            println!();
            continue;
        }
        println!(
            "  {:<10} {:<14} {:<10} {:<8} {}",
            "ID", "Assignee", "Due", "Pri", "Title"
        );
        for t in tasks {
            println!(
                "  {:<10} {:<14} {:<10} {:<8} {}",
                truncate(t.id.as_str(), 10),
                truncate(t.assignee.as_deref().unwrap_or("-"), 14),
                format_due_relative(t.due(), today),
                truncate(t.priority.as_deref().unwrap_or("-"), 8),
                t.title
            );
        }
        println!();
    }
}
