//! # Broadcast Hub
//!
//! Room membership per poll and best-effort snapshot fan-out.
//!
//! The hub is a live-update channel, not a durable log: a session that joins
//! after a publish call is not retroactively delivered that snapshot, and a
//! failed delivery to one subscriber never affects the others. Membership is
//! in-memory and scoped to the serving process; the hub holds no vote data.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::poll::TallySnapshot;

use super::errors::{RealtimeError, RealtimeResult};
use super::session::{Session, SnapshotReceiver};

/// Membership tables, kept consistent under one lock
#[derive(Debug, Default)]
struct HubState {
    /// Active sessions by id
    sessions: HashMap<String, Session>,

    /// Room membership: poll id -> session ids
    rooms: HashMap<Uuid, HashSet<String>>,
}

/// Result of a publish call
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sessions in the room at publish time
    pub matched: usize,
    /// Snapshots handed to a live channel
    pub delivered: usize,
    /// Sessions whose channel was already gone
    pub failed: usize,
}

/// Fan-out hub for tally snapshots
#[derive(Debug, Default)]
pub struct BroadcastHub {
    state: RwLock<HubState>,
}

impl BroadcastHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and hand back its snapshot channel.
    ///
    /// Reconnecting under an existing id replaces the old session; the old
    /// channel closes and its memberships are dropped.
    pub fn connect(&self, session_id: &str) -> SnapshotReceiver {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(mut state) = self.state.write() {
            if let Some(old) = state.sessions.remove(session_id) {
                for poll_id in old.joined() {
                    if let Some(members) = state.rooms.get_mut(poll_id) {
                        members.remove(session_id);
                    }
                }
            }
            state
                .sessions
                .insert(session_id.to_string(), Session::new(session_id.to_string(), tx));
        }

        info!(session_id, "session connected");
        rx
    }

    /// Drop a session and all of its room memberships
    pub fn disconnect(&self, session_id: &str) {
        if let Ok(mut state) = self.state.write() {
            if let Some(session) = state.sessions.remove(session_id) {
                for poll_id in session.joined() {
                    if let Some(members) = state.rooms.get_mut(poll_id) {
                        members.remove(session_id);
                    }
                }
            }
        }
        info!(session_id, "session disconnected");
    }

    /// Add a session to a poll's room; joining twice has the effect of once
    pub fn join(&self, session_id: &str, poll_id: Uuid) -> RealtimeResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RealtimeError::Internal("lock poisoned".into()))?;

        let Some(session) = state.sessions.get_mut(session_id) else {
            return Err(RealtimeError::SessionNotFound(session_id.to_string()));
        };
        session.join(poll_id);
        state
            .rooms
            .entry(poll_id)
            .or_default()
            .insert(session_id.to_string());
        Ok(())
    }

    /// Remove a session from a poll's room
    pub fn leave(&self, session_id: &str, poll_id: Uuid) -> RealtimeResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RealtimeError::Internal("lock poisoned".into()))?;

        let Some(session) = state.sessions.get_mut(session_id) else {
            return Err(RealtimeError::SessionNotFound(session_id.to_string()));
        };
        session.leave(poll_id);
        if let Some(members) = state.rooms.get_mut(&poll_id) {
            members.remove(session_id);
        }
        Ok(())
    }

    /// Remove a session from every room it joined, keeping the session alive
    pub fn leave_all(&self, session_id: &str) {
        if let Ok(mut state) = self.state.write() {
            let joined: Vec<Uuid> = state
                .sessions
                .get(session_id)
                .map(|s| s.joined().iter().copied().collect())
                .unwrap_or_default();

            for poll_id in joined {
                if let Some(session) = state.sessions.get_mut(session_id) {
                    session.leave(poll_id);
                }
                if let Some(members) = state.rooms.get_mut(&poll_id) {
                    members.remove(session_id);
                }
            }
        }
    }

    /// Deliver a snapshot to every session currently in its poll's room.
    ///
    /// Best-effort and non-blocking per recipient: a slow or vanished
    /// subscriber is counted as failed and skipped, never waited on.
    pub fn publish(&self, snapshot: &TallySnapshot) -> PublishReport {
        let mut report = PublishReport::default();

        let state = match self.state.read() {
            Ok(s) => s,
            Err(_) => return report,
        };

        let Some(members) = state.rooms.get(&snapshot.poll_id) else {
            return report;
        };
        report.matched = members.len();

        for session_id in members {
            match state.sessions.get(session_id) {
                Some(session) => match session.deliver(snapshot.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(()) => report.failed += 1,
                },
                None => report.failed += 1,
            }
        }

        if report.failed > 0 {
            warn!(
                poll_id = %snapshot.poll_id,
                failed = report.failed,
                "some subscribers missed a tally snapshot"
            );
        }
        report
    }

    /// Number of registered sessions
    pub fn session_count(&self) -> usize {
        self.state.read().map(|s| s.sessions.len()).unwrap_or(0)
    }

    /// Number of sessions in a poll's room
    pub fn room_size(&self, poll_id: Uuid) -> usize {
        self.state
            .read()
            .map(|s| s.rooms.get(&poll_id).map_or(0, HashSet::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::PollOption;

    fn snapshot(poll_id: Uuid) -> TallySnapshot {
        TallySnapshot::open(poll_id, vec![PollOption::new("Tea".to_string())])
    }

    #[test]
    fn test_connect_disconnect() {
        let hub = BroadcastHub::new();

        let _rx = hub.connect("sess-1");
        assert_eq!(hub.session_count(), 1);

        hub.disconnect("sess-1");
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_join_requires_session() {
        let hub = BroadcastHub::new();
        let err = hub.join("ghost", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RealtimeError::SessionNotFound(_)));
    }

    #[test]
    fn test_join_is_idempotent() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();

        let _rx = hub.connect("sess-1");
        hub.join("sess-1", poll_id).unwrap();
        hub.join("sess-1", poll_id).unwrap();

        assert_eq!(hub.room_size(poll_id), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_room_members_only() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();
        let other_poll = Uuid::new_v4();

        let mut rx_member = hub.connect("member");
        let mut rx_other = hub.connect("other");
        hub.join("member", poll_id).unwrap();
        hub.join("other", other_poll).unwrap();

        let report = hub.publish(&snapshot(poll_id));
        assert_eq!(report.matched, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 0);

        assert_eq!(rx_member.recv().await.unwrap().poll_id, poll_id);
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_replay_for_late_joiner() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();

        let _rx_early = hub.connect("early");
        hub.join("early", poll_id).unwrap();
        hub.publish(&snapshot(poll_id));

        // Joins after the publish: nothing waiting in its channel
        let mut rx_late = hub.connect("late");
        hub.join("late", poll_id).unwrap();
        assert!(rx_late.try_recv().is_err());
    }

    #[test]
    fn test_dead_receiver_counted_failed_others_delivered() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();

        let rx_dead = hub.connect("dead");
        let _rx_live = hub.connect("live");
        hub.join("dead", poll_id).unwrap();
        hub.join("live", poll_id).unwrap();
        drop(rx_dead);

        let report = hub.publish(&snapshot(poll_id));
        assert_eq!(report.matched, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_leave_all_keeps_session() {
        let hub = BroadcastHub::new();
        let poll_a = Uuid::new_v4();
        let poll_b = Uuid::new_v4();

        let _rx = hub.connect("sess-1");
        hub.join("sess-1", poll_a).unwrap();
        hub.join("sess-1", poll_b).unwrap();

        hub.leave_all("sess-1");
        assert_eq!(hub.room_size(poll_a), 0);
        assert_eq!(hub.room_size(poll_b), 0);
        assert_eq!(hub.session_count(), 1);
    }

    #[test]
    fn test_disconnect_clears_memberships() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();

        let _rx = hub.connect("sess-1");
        hub.join("sess-1", poll_id).unwrap();
        hub.disconnect("sess-1");

        assert_eq!(hub.room_size(poll_id), 0);
        let report = hub.publish(&snapshot(poll_id));
        assert_eq!(report.matched, 0);
    }

    #[test]
    fn test_reconnect_replaces_session() {
        let hub = BroadcastHub::new();
        let poll_id = Uuid::new_v4();

        let _rx_old = hub.connect("sess-1");
        hub.join("sess-1", poll_id).unwrap();

        // Same id reconnects: old memberships are gone
        let _rx_new = hub.connect("sess-1");
        assert_eq!(hub.session_count(), 1);
        assert_eq!(hub.room_size(poll_id), 0);
    }
}
