//! Per-process pickup bookkeeping.

use std::collections::HashSet;

use crate::{ProjectItemId, SessionId, Timestamp};

/// The set of board items picked up during this process lifetime.
///
/// An item id enters the set exactly once, immediately before delegation, and
/// is never removed, so each item is delegated at most once per session even
/// when its delegation fails. The set is not persisted: a restart starts empty,
/// and the board's status field is the durable record of what was picked up.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    started_at: Timestamp,
    picked_up: HashSet<ProjectItemId>,
}

impl SessionState {
    /// Starts a new, empty session.
    pub fn new() -> Self {
        Self {
            id: SessionId::new_random(),
            started_at: Timestamp::now(),
            picked_up: HashSet::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Records `item` as picked up.
    ///
    /// Returns `false` (and changes nothing) if it was already picked up in
    /// this session.
    pub fn claim(&mut self, item: &ProjectItemId) -> bool {
        if self.picked_up.contains(item) {
            return false;
        }
        self.picked_up.insert(item.clone())
    }

    pub fn is_claimed(&self, item: &ProjectItemId) -> bool {
        self.picked_up.contains(item)
    }

    /// Number of items picked up so far.
    pub fn claimed_count(&self) -> usize {
        self.picked_up.len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
