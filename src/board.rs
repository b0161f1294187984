//! In-memory board state: one ordered list of tasks per column.
//!
//! The board is only ever changed in two ways: replaced wholesale from a server
//! load, or patched locally when a card is moved. Both keep every task in
//! exactly one column.

use crate::fields::ColumnId;
use crate::task::{Task, TaskId};

/// Tasks grouped by column, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    columns: [Vec<Task>; 5],
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from a server task list.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Self::new();
        board.replace_all(tasks);
        board
    }

    /// Discard the current contents and bucket `tasks` by classified status,
    /// keeping the server's order within each column.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        for column in self.columns.iter_mut() {
            column.clear();
        }
        for task in tasks {
            let column = task.column();
            self.columns[column.index()].push(task);
        }
    }

    /// Move the task at `from_index` of `from` to `to_index` of `to`.
    ///
    /// Returns `false` and leaves the board untouched when the move is a no-op,
    /// an index is out of range, or the task at `from_index` is not `task_id`.
    pub fn move_local(
        &mut self,
        task_id: &TaskId,
        from: ColumnId,
        from_index: usize,
        to: ColumnId,
        to_index: usize,
    ) -> bool {
        if from == to && from_index == to_index {
            return false;
        }

        let source = &self.columns[from.index()];
        match source.get(from_index) {
            Some(task) if &task.id == task_id => {}
            _ => return false,
        }

        // Insert bound is measured after removal from the source column.
        let dest_len = if from == to {
            source.len() - 1
        } else {
            self.columns[to.index()].len()
        };
        if to_index > dest_len {
            return false;
        }

        let mut task = self.columns[from.index()].remove(from_index);
        if from != to {
            task.status = Some(to.token().to_string());
        }
        self.columns[to.index()].insert(to_index, task);
        true
    }

    pub fn column(&self, column: ColumnId) -> &[Task] {
        &self.columns[column.index()]
    }

    /// Iterate columns in display order.
    pub fn columns(&self) -> impl Iterator<Item = (ColumnId, &[Task])> {
        ColumnId::ALL
            .into_iter()
            .map(move |column| (column, self.column(column)))
    }

    /// Total number of tasks across all columns.
    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locate a task by id.
    pub fn find(&self, task_id: &TaskId) -> Option<(ColumnId, usize)> {
        self.columns().find_map(|(column, tasks)| {
            tasks
                .iter()
                .position(|t| &t.id == task_id)
                .map(|index| (column, index))
        })
    }

    pub fn get(&self, column: ColumnId, index: usize) -> Option<&Task> {
        self.column(column).get(index)
    }
}
