//! Fan-out of engine messages to every connected client
//!
//! A broadcast serializes the message once, snapshots the session set and
//! queues the frame on each session without waiting. A session that cannot
//! take the frame (closed, or its queue is full) is removed and closed; the
//! remaining sessions are unaffected.

use bytes::Bytes;
use cortex_core::{frame, Message};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::session::{Session, SessionId};

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the frame was queued on
    pub delivered: usize,
    /// Sessions removed because they could not take the frame
    pub dropped: Vec<SessionId>,
}

/// The set of sessions receiving broadcasts
#[derive(Default)]
pub struct Broadcaster {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<Session>) {
        debug!("Registered session {}", session.id);
        self.sessions.insert(session.id.clone(), session);
    }

    /// Remove a session. Returns false if it was not registered.
    pub fn deregister(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!("Deregistered session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Send a message to every registered session
    pub async fn broadcast(&self, msg: &Message) -> BroadcastReport {
        let json = match frame::to_json(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!("Cannot serialize {}: {}", msg.address, e);
                return BroadcastReport::default();
            }
        };
        self.broadcast_raw(Bytes::from(json)).await
    }

    /// Send an already serialized frame to every registered session
    pub async fn broadcast_raw(&self, data: Bytes) -> BroadcastReport {
        let snapshot: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for session in snapshot {
            match session.try_send(data.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Dropping client {} ({}): {}", session.id, session.peer, e);
                    failed.push(session);
                }
            }
        }

        for session in failed {
            self.sessions.remove(&session.id);
            session.close().await;
            report.dropped.push(session.id.clone());
        }

        report
    }

    /// Close every session and empty the set
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.sessions.clear();

        for session in sessions {
            session.close().await;
        }
    }
}
