//! Live Kanban board interface.
//!
//! Five fixed columns, one per workflow stage. Cards are moved with a keyboard
//! drag gesture; the move is shown immediately and saved in the background,
//! and changes made by other users arrive through the realtime stream.

use std::io;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::TaskRepository;
use crate::display::{card_meta, format_due_relative};
use crate::drag::{DropOutcome, Slot};
use crate::fields::ColumnId;
use crate::session::{BoardSession, Effect, SessionEvent};
use crate::task::Task;
use crate::tui::colors::{column_color, text_on, DARK_RED};
use crate::tui::enums::DragState;

const CARD_HEIGHT: usize = 5;

/// Main board application state.
pub struct BoardApp<R: TaskRepository> {
    session: BoardSession<R>,
    events: UnboundedReceiver<SessionEvent>,
    tenant: Option<String>,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; 5],
    drag: DragState,
    show_task_detail: bool,
    status_message: String,
}

impl<R: TaskRepository> BoardApp<R> {
    pub fn new(
        session: BoardSession<R>,
        events: UnboundedReceiver<SessionEvent>,
        tenant: Option<String>,
    ) -> Self {
        BoardApp {
            session,
            events,
            tenant,
            selected_column: ColumnId::Todo.index(),
            selected_card: 0,
            column_scroll_offsets: [0; 5],
            drag: DragState::Idle,
            show_task_detail: false,
            status_message: String::new(),
        }
    }

    fn selected_column_id(&self) -> ColumnId {
        ColumnId::from_index(self.selected_column).unwrap_or(ColumnId::Backlog)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.session
            .board()
            .get(self.selected_column_id(), self.selected_card)
    }

    fn column_lens(&self) -> [usize; 5] {
        let board = self.session.board();
        ColumnId::ALL.map(|c| board.column(c).len())
    }

    fn clamp_selection(&mut self) {
        let len = self.column_lens()[self.selected_column];
        if len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Apply everything background work has reported since the last frame.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let effect = self.session.handle(event);
            self.on_effect(effect);
        }
    }

    fn on_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Reloaded { .. } => self.clamp_selection(),
            Effect::PersistFailed { reloading: true, .. } => {
                self.set_status_message("Could not save the move; reloading board")
            }
            _ => {}
        }
    }

    /// Handle a key press. Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        self.status_message.clear();

        if self.show_task_detail {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.show_task_detail = false;
            }
            return false;
        }

        if self.drag.is_dragging() {
            self.handle_drag_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Char('h') => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_column + 1 < ColumnId::ALL.len() {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_card += 1;
                self.clamp_selection();
            }
            KeyCode::Char(' ') => {
                if let Some(task) = self.selected_task() {
                    let source = Slot::new(self.selected_column_id(), self.selected_card);
                    self.drag = DragState::pick(task.id.clone(), source);
                }
            }
            KeyCode::Enter => {
                self.show_task_detail = self.selected_task().is_some();
            }
            KeyCode::Char('r') => {
                self.session.reload();
                self.set_status_message("Reloading…");
            }
            _ => {}
        }
        false
    }

    fn handle_drag_key(&mut self, key: KeyEvent) {
        let lens = self.column_lens();
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.drag.shift_column(-1, &lens),
            KeyCode::Right | KeyCode::Char('l') => self.drag.shift_column(1, &lens),
            KeyCode::Up | KeyCode::Char('k') => self.drag.shift_index(-1, &lens),
            KeyCode::Down | KeyCode::Char('j') => self.drag.shift_index(1, &lens),
            KeyCode::Char(' ') | KeyCode::Enter => self.finish_drag(true),
            KeyCode::Esc => self.finish_drag(false),
            _ => {}
        }
    }

    fn finish_drag(&mut self, commit: bool) {
        let Some(result) = self.drag.finish(commit) else {
            return;
        };
        match self.session.drop_card(&result) {
            DropOutcome::Moved(update) => {
                if let Some((column, index)) = self.session.board().find(&update.task_id) {
                    self.selected_column = column.index();
                    self.selected_card = index;
                }
            }
            DropOutcome::Rejected => {
                self.set_status_message("The board changed while moving; card left in place");
                self.clamp_selection();
            }
            DropOutcome::Cancelled | DropOutcome::Unchanged => {}
        }
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(self.handle_key(key));
            }
        }
        Ok(false)
    }

    /// Cards to draw in a column. While dragging, the carried card is shown at
    /// its drop target instead of its source.
    fn column_cards(&self, column: ColumnId) -> (Vec<&Task>, Option<usize>) {
        let board = self.session.board();
        let tasks = board.column(column);
        match &self.drag {
            DragState::Dragging { task_id, source, target } => {
                let carried = board
                    .get(source.column, source.index)
                    .filter(|t| &t.id == task_id);
                let mut cards: Vec<&Task> = tasks
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| {
                        !(carried.is_some() && column == source.column && *i == source.index)
                    })
                    .map(|(_, t)| t)
                    .collect();
                match carried {
                    Some(task) if column == target.column => {
                        let at = target.index.min(cards.len());
                        cards.insert(at, task);
                        (cards, Some(at))
                    }
                    _ => (cards, None),
                }
            }
            DragState::Idle => {
                let highlight = (column.index() == self.selected_column && !tasks.is_empty())
                    .then_some(self.selected_card);
                (tasks.iter().collect(), highlight)
            }
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let banner_height = if self.session.load_error().is_some() { 1 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),             // Header
                Constraint::Length(banner_height), // Load error
                Constraint::Min(0),                // Board
                Constraint::Length(1),             // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        if let Some(error) = self.session.load_error() {
            let banner = Paragraph::new(format!(" {error}  (r to retry)"))
                .style(Style::default().bg(DARK_RED).fg(Color::White));
            f.render_widget(banner, chunks[1]);
        }
        self.render_board(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let mut context = format!("Board: {}", self.session.board_id());
        if let Some(tenant) = &self.tenant {
            context.push_str(&format!("  Tenant: {tenant}"));
        }
        if self.session.is_loading() {
            context.push_str("  (loading…)");
        }

        let header_text = vec![Line::from(vec![
            Span::styled("TASK BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                context,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 5); 5])
            .split(area);

        for (column, &column_area) in ColumnId::ALL.iter().zip(columns_layout.iter()) {
            let offset = self.render_column(f, column_area, *column);
            self.column_scroll_offsets[column.index()] = offset;
        }
    }

    /// Draw one column and return its scroll offset after keeping the
    /// highlighted card in view.
    fn render_column(&self, f: &mut Frame, area: Rect, column: ColumnId) -> usize {
        let column_index = column.index();
        let is_focused = match self.drag.target() {
            Some(target) => target.column == column,
            None => column_index == self.selected_column,
        };
        let accent = column_color(column);

        let border_style = if is_focused {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let (cards, highlight) = self.column_cards(column);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", column.title(), cards.len()))
            .border_style(border_style);

        let inner = block.inner(area);
        f.render_widget(block, area);

        if cards.is_empty() {
            return 0;
        }

        let available_height = inner.height as usize;
        let visible_cards = available_height / CARD_HEIGHT;

        let mut scroll_offset = self.column_scroll_offsets[column_index].min(cards.len() - 1);
        if let Some(h) = highlight {
            if h < scroll_offset {
                scroll_offset = h;
            } else if visible_cards > 0 && h >= scroll_offset + visible_cards {
                scroll_offset = h + 1 - visible_cards;
            }
        }
        let carrying = self.drag.is_dragging();
        let mut current_y = 0;
        let mut rendered_cards = 0;
        for (card_index, task) in cards.iter().enumerate().skip(scroll_offset) {
            if current_y + CARD_HEIGHT > available_height {
                break;
            }
            let card_area = Rect {
                x: inner.x,
                y: inner.y + current_y as u16,
                width: inner.width,
                height: CARD_HEIGHT as u16,
            };
            let is_highlighted = highlight == Some(card_index);
            render_card(f, card_area, task, accent, is_highlighted, carrying && is_highlighted);
            current_y += CARD_HEIGHT;
            rendered_cards += 1;
        }

        if scroll_offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{} above", scroll_offset))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect { height: 1, ..inner });
        }

        let remaining = cards.len() - scroll_offset - rendered_cards;
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{} below", remaining))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    y: inner.y + inner.height - 1,
                    height: 1,
                    ..inner
                },
            );
        }
        scroll_offset
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let connection = self.session.connection();
        let dot = if connection.is_connected() { "●" } else { "○" };
        let pending = match self.session.pending_writes() {
            0 => String::new(),
            n => format!(" | saving {n}"),
        };

        let message = if let Some(notice) = self.session.notice(Instant::now()) {
            notice.to_string()
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if let Some(target) = self.drag.target() {
            format!(
                "Drop into {} at {} | ←→↑↓: Target | Space/Enter: Drop | Esc: Cancel",
                target.column.title(),
                target.index + 1
            )
        } else {
            format!(
                "Tasks: {} | Space: Pick up | Enter: Details | r: Reload | q: Quit",
                self.session.board().len()
            )
        };

        let accent = match self.drag.target() {
            Some(target) => column_color(target.column),
            None => column_color(self.selected_column_id()),
        };
        let status = Paragraph::new(format!("{dot} {}{pending} | {message}", connection.label()))
            .style(Style::default().bg(accent).fg(text_on(accent)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task() else {
            return;
        };

        let popup_area = centered_rect(f.area(), 80);
        f.render_widget(Clear, popup_area);

        let today = Local::now().date_naive();
        let due = match (task.due(), task.due_date.as_deref()) {
            (Some(d), _) => format!("{} ({})", d, format_due_relative(Some(d), today)),
            (None, Some(raw)) => raw.to_string(),
            (None, None) => "-".to_string(),
        };

        let detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task #{}: {}", task.id, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Column:    {}", task.column().title())),
            Line::from(format!("Status:    {}", task.status.as_deref().unwrap_or("-"))),
            Line::from(format!("Assignee:  {}", task.assignee.as_deref().unwrap_or("-"))),
            Line::from(format!("Due:       {}", due)),
            Line::from(format!("Priority:  {}", task.priority.as_deref().unwrap_or("-"))),
            Line::from(""),
            Line::from("Description:"),
            Line::from(task.description.as_deref().unwrap_or("-")),
        ];

        let accent = column_color(task.column());
        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(accent).add_modifier(Modifier::BOLD));

        let popup_paragraph = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup_paragraph, popup_area);
    }

    /// Main event loop.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.drain_events();
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

fn render_card(f: &mut Frame, area: Rect, task: &Task, accent: Color, selected: bool, carried: bool) {
    let style = if carried {
        Style::default()
            .bg(accent)
            .fg(text_on(accent))
            .add_modifier(Modifier::BOLD | Modifier::ITALIC)
    } else if selected {
        Style::default().bg(accent).fg(text_on(accent)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    };

    let mut card_text = vec![Line::from(if carried {
        format!("» #{}", task.id)
    } else {
        format!("#{}", task.id)
    })];

    let available_width = area.width.saturating_sub(2) as usize;
    for line in wrap_title(&task.title, available_width, 2) {
        card_text.push(Line::from(line));
    }

    let meta = card_meta(task, Local::now().date_naive());
    if !meta.is_empty() {
        card_text.push(Line::from(meta));
    }

    let card_block = Paragraph::new(card_text)
        .block(Block::default().borders(Borders::ALL))
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(card_block, area);
}

/// A rect covering `percent` of `area` in each dimension, centered in it.
fn centered_rect(area: Rect, percent: u16) -> Rect {
    let scale = |len: u16| (u32::from(len) * u32::from(percent.min(100)) / 100) as u16;
    let width = scale(area.width);
    let height = scale(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Greedy word wrap, keeping at most `max_lines` lines.
fn wrap_title(title: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in title.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            if lines.len() == max_lines {
                return lines;
            }
            current = word.to_string();
        }
    }
    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines
}
