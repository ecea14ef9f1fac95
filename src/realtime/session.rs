//! # Subscription Sessions
//!
//! One live viewer connection: its outbound snapshot channel and the set of
//! poll rooms it currently belongs to.

use std::collections::HashSet;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::poll::TallySnapshot;

/// Snapshot sender for a session
pub type SnapshotSender = mpsc::UnboundedSender<TallySnapshot>;

/// Snapshot receiver handed to the connection handler
pub type SnapshotReceiver = mpsc::UnboundedReceiver<TallySnapshot>;

/// A connected viewer's membership state
#[derive(Debug)]
pub struct Session {
    /// Opaque session identifier, assigned on connect
    pub id: String,

    /// Outbound channel; sends never block the publisher
    sender: SnapshotSender,

    /// Poll rooms this session has joined
    joined: HashSet<Uuid>,
}

impl Session {
    pub(crate) fn new(id: String, sender: SnapshotSender) -> Self {
        Self {
            id,
            sender,
            joined: HashSet::new(),
        }
    }

    /// Join a poll room. Returns false if already a member (idempotent).
    pub(crate) fn join(&mut self, poll_id: Uuid) -> bool {
        self.joined.insert(poll_id)
    }

    /// Leave a poll room. Leaving a room never joined is a no-op.
    pub(crate) fn leave(&mut self, poll_id: Uuid) -> bool {
        self.joined.remove(&poll_id)
    }

    /// Rooms this session currently belongs to
    pub fn joined(&self) -> &HashSet<Uuid> {
        &self.joined
    }

    /// Whether this session is in the given poll's room
    pub fn is_member(&self, poll_id: Uuid) -> bool {
        self.joined.contains(&poll_id)
    }

    /// Best-effort delivery; Err means the receiver is gone
    pub(crate) fn deliver(&self, snapshot: TallySnapshot) -> Result<(), ()> {
        self.sender.send(snapshot).map_err(|_| ())
    }
}
