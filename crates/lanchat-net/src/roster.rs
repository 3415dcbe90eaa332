//! Concurrent client roster.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::session::Session;

/// Session registry keyed by session id. Mutated by the accept loop
/// (insert) and by each handler's cleanup (remove); broadcast iterates a
/// snapshot so concurrent removals never invalidate iteration.
#[derive(Default)]
pub struct Roster {
    sessions: DashMap<Uuid, Arc<Session>>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id(), session);
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Stable copy of the current sessions.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&self) {
        self.sessions.clear();
    }
}
