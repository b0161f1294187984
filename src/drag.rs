//! Drop reconciliation.
//!
//! Whatever produces the drag gesture (the keyboard gesture in the TUI, or any
//! other front end) only has to report where the card came from and where it
//! was released. The board is updated optimistically here, before any network
//! traffic; persisting the new status is the caller's job.

use crate::board::BoardState;
use crate::fields::ColumnId;
use crate::task::TaskId;

/// A card position on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub column: ColumnId,
    pub index: usize,
}

impl Slot {
    pub fn new(column: ColumnId, index: usize) -> Self {
        Slot { column, index }
    }
}

/// A completed drag gesture. `destination` is `None` when the card was
/// released outside any column or the gesture was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResult {
    pub task_id: TaskId,
    pub source: Slot,
    pub destination: Option<Slot>,
}

/// Status change to send to the server after a successful local move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub status: ColumnId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// No destination; nothing happened.
    Cancelled,
    /// Dropped where it started; nothing happened.
    Unchanged,
    /// The board no longer matches the gesture (e.g. a reload landed mid-drag).
    Rejected,
    /// The board was updated; the new status should be persisted.
    Moved(StatusUpdate),
}

/// Apply a finished drop to the board.
pub fn resolve_drop(board: &mut BoardState, drop: &DropResult) -> DropOutcome {
    let Some(destination) = drop.destination else {
        return DropOutcome::Cancelled;
    };
    if destination == drop.source {
        return DropOutcome::Unchanged;
    }

    let moved = board.move_local(
        &drop.task_id,
        drop.source.column,
        drop.source.index,
        destination.column,
        destination.index,
    );
    if !moved {
        return DropOutcome::Rejected;
    }

    DropOutcome::Moved(StatusUpdate {
        task_id: drop.task_id.clone(),
        status: destination.column,
    })
}
