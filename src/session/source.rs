use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{Session, SessionId};
use crate::TracksideError;

/// Interface to whatever retrieves recorded sessions.
///
/// Loads are blocking, caching and retries are the implementation's business.
pub trait SessionSource {
    /// Load a session, failing with [`TracksideError::SessionLoad`] when the
    /// identifier does not correspond to a retrievable session
    fn load_session(&self, id: SessionId) -> Result<Session, TracksideError>;
}

impl<S: SessionSource + ?Sized> SessionSource for &S {
    fn load_session(&self, id: SessionId) -> Result<Session, TracksideError> {
        (**self).load_session(id)
    }
}

/// Session source backed by sessions held in memory.
///
/// Records every load attempt and can be told to fail specific sessions,
/// which makes it the source of choice for driving the pipeline in tests.
#[derive(Default)]
pub struct InMemorySource {
    sessions: HashMap<SessionId, Session>,
    failing: HashSet<SessionId>,
    loads: RefCell<Vec<SessionId>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.sessions.insert(session.id, session);
        self
    }

    /// Make every load of `id` fail as if the source were unreachable
    pub fn failing_on(mut self, id: SessionId) -> Self {
        self.failing.insert(id);
        self
    }

    /// Every session id requested so far, in order
    pub fn loads(&self) -> Vec<SessionId> {
        self.loads.borrow().clone()
    }
}

impl SessionSource for InMemorySource {
    fn load_session(&self, id: SessionId) -> Result<Session, TracksideError> {
        self.loads.borrow_mut().push(id);
        if self.failing.contains(&id) {
            return Err(TracksideError::SessionLoad {
                session: id,
                reason: "data source unreachable".to_string(),
            });
        }
        self.sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| TracksideError::SessionLoad {
                session: id,
                reason: "unknown session".to_string(),
            })
    }
}
