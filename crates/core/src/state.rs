//! Session state owned by one respondent's run.

use serde::{Deserialize, Serialize};

use crate::history::{HistoryEntry, NavEntry};
use crate::model::NodeId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    Running,
    Ended,
}

/// Position, history and back-navigation trail of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Node on display. `None` unless running.
    pub current: Option<NodeId>,
    pub history: Vec<HistoryEntry>,
    pub nav_stack: Vec<NavEntry>,
    /// Set by a step that diverged from the recorded path.
    pub path_modified: bool,
    /// History index recorded for `current` when it was reached by walking
    /// back or forward along recorded entries.
    pub revisiting: Option<usize>,
    /// Bumped on every state change; stale auto-advance tickets compare unequal.
    pub generation: u64,
}

impl SessionState {
    /// A fresh running state positioned on `start`.
    pub fn running_at(start: NodeId, generation: u64) -> Self {
        Self {
            status: SessionStatus::Running,
            current: Some(start),
            generation,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// Appends an entry and returns its index.
    pub fn record(&mut self, entry: HistoryEntry) -> usize {
        self.history.push(entry);
        self.history.len() - 1
    }

    /// Drops the history suffix starting at `cut` and every nav entry that
    /// points into it.
    pub fn truncate_from(&mut self, cut: usize) {
        self.history.truncate(cut);
        self.nav_stack.retain(|entry| entry.history_index < cut);
    }

    pub(crate) fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn end(&mut self) {
        self.status = SessionStatus::Ended;
        self.current = None;
        self.revisiting = None;
        self.touch();
    }
}
