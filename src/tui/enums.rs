//! Enumerations for TUI state management.

use crate::drag::{DropResult, Slot};
use crate::fields::ColumnId;
use crate::task::TaskId;

/// Keyboard drag gesture.
///
/// While dragging, `target.index` is an insertion point counted as if the card
/// had already been lifted out of its source column.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: TaskId,
        source: Slot,
        target: Slot,
    },
}

impl DragState {
    /// Pick up a card; the initial target is where it already is.
    pub fn pick(task_id: TaskId, source: Slot) -> Self {
        DragState::Dragging {
            task_id,
            source,
            target: source,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    pub fn target(&self) -> Option<Slot> {
        match self {
            DragState::Dragging { target, .. } => Some(*target),
            DragState::Idle => None,
        }
    }

    /// Move the target one column left (`-1`) or right (`+1`), clamping the
    /// insertion point to what the new column allows.
    pub fn shift_column(&mut self, delta: isize, lens: &[usize; 5]) {
        if let DragState::Dragging { source, target, .. } = self {
            let next = target.column.index() as isize + delta;
            if let Some(column) = usize::try_from(next).ok().and_then(ColumnId::from_index) {
                target.column = column;
                target.index = target.index.min(max_insert(column, source, lens));
            }
        }
    }

    /// Move the insertion point up (`-1`) or down (`+1`) within the target column.
    pub fn shift_index(&mut self, delta: isize, lens: &[usize; 5]) {
        if let DragState::Dragging { source, target, .. } = self {
            let max = max_insert(target.column, source, lens) as isize;
            target.index = (target.index as isize + delta).clamp(0, max) as usize;
        }
    }

    /// End the gesture. `commit == false` reports a cancelled drop.
    pub fn finish(&mut self, commit: bool) -> Option<DropResult> {
        match std::mem::take(self) {
            DragState::Dragging { task_id, source, target } => Some(DropResult {
                task_id,
                source,
                destination: commit.then_some(target),
            }),
            DragState::Idle => None,
        }
    }
}

fn max_insert(column: ColumnId, source: &Slot, lens: &[usize; 5]) -> usize {
    let len = lens[column.index()];
    if column == source.column {
        len.saturating_sub(1)
    } else {
        len
    }
}
