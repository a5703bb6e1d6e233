//! Per-screen owners of list state.
//!
//! A session applies every change through an explicit `apply(delta)` transition
//! under its own lock, then announces it on a broadcast channel. Fetches carry
//! the generation they were issued under; switching context bumps the
//! generation so late completions are dropped instead of applied.

use crate::models::RecordKind;

mod user_detail;
mod user_list;

pub use user_detail::{PageDelta, PageState, UserDetailSession};
pub use user_list::{UserListDelta, UserListSession, UserListState};

const EVENT_CAPACITY: usize = 64;

/// Change notifications for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user list changed
    ListReloaded,
    /// Entries of one record tab changed
    RecordsReloaded(RecordKind),
    /// Emptiness of the visible list flipped or was re-evaluated
    EmptyState(bool),
}

/// Result of a fetch-and-apply call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page applied; `added` items appended or loaded
    Applied { added: usize },
    /// Nothing left to fetch; state unchanged
    Exhausted,
    /// Context changed while the fetch was in flight; result dropped
    Discarded,
}

impl PageOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PageOutcome::Applied { .. })
    }
}
