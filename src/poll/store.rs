//! # Tally Store
//!
//! Authoritative vote counts and poll metadata, with per-poll mutual
//! exclusion. The dedup ledger insert and the counter increment happen under
//! one per-poll lock, so a vote is either fully applied or not at all.
//!
//! Mutating paths acquire the per-poll lock through a bounded wait; running
//! out the wait maps to a retryable `Transient` error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

use super::errors::{PollError, PollResult};
use super::model::{Poll, TallySnapshot};
use super::persist::{PersistedPoll, StateFile, StoreState};
use super::winner::resolve_winners;

/// Bounded wait for a poll's mutation lock
const LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Longest accepted voting window (one year). Also keeps the expiry
/// timestamp arithmetic in chrono's representable range.
const MAX_DURATION_MINUTES: i64 = 366 * 24 * 60;

/// A poll together with its dedup ledger
///
/// Everything behind one mutex: holding the guard makes the
/// ledger-insert + counter-increment pair indivisible.
#[derive(Debug)]
struct PollEntry {
    poll: Poll,
    /// Voter ids with a recorded vote; presence means "already voted"
    voters: HashSet<String>,
}

impl PollEntry {
    /// Apply the admission checks in order, then record the vote.
    ///
    /// First failure wins; a rejection leaves the entry untouched.
    fn admit(&mut self, voter_id: &str, option_id: Uuid, now: DateTime<Utc>) -> PollResult<()> {
        if !self.poll.is_open(now) {
            return Err(PollError::PollClosed);
        }
        if self.poll.option(option_id).is_none() {
            return Err(PollError::InvalidOption(option_id));
        }
        if self.voters.contains(voter_id) {
            return Err(PollError::AlreadyVoted);
        }

        self.voters.insert(voter_id.to_string());
        match self.poll.option_mut(option_id) {
            Some(option) => {
                option.votes += 1;
                Ok(())
            }
            // Checked above; a miss here means the option set mutated,
            // which the model forbids.
            None => Err(PollError::Internal("option set changed mid-vote".into())),
        }
    }

    /// Build a snapshot from current counts.
    ///
    /// Uses the derived-open predicate, so an expired-but-unflipped poll
    /// already reports closed with winners attached.
    fn snapshot(&self, now: DateTime<Utc>) -> TallySnapshot {
        if self.poll.is_open(now) {
            TallySnapshot::open(self.poll.id, self.poll.options.clone())
        } else {
            TallySnapshot::closed(
                self.poll.id,
                self.poll.options.clone(),
                resolve_winners(&self.poll.options),
            )
        }
    }
}

/// The authoritative poll store
///
/// Single writer-of-record for counts. Different polls never contend with
/// each other; all mutations to one poll are serialized on its own lock.
#[derive(Debug)]
pub struct TallyStore {
    polls: RwLock<HashMap<Uuid, Arc<Mutex<PollEntry>>>>,
    state_file: Option<StateFile>,
    /// Serializes write-through saves so a later state never gets
    /// overwritten by an earlier one
    save_lock: Mutex<()>,
}

impl TallyStore {
    /// Create an in-memory store with no durability
    pub fn new() -> Self {
        Self {
            polls: RwLock::new(HashMap::new()),
            state_file: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Create a store backed by a JSON state file, reloading prior state
    pub fn with_state_file(state_file: StateFile) -> PollResult<Self> {
        let state = state_file.load()?;

        let mut polls = HashMap::new();
        for persisted in state.polls {
            let entry = PollEntry {
                voters: persisted.voters.into_iter().collect(),
                poll: persisted.poll,
            };
            polls.insert(entry.poll.id, Arc::new(Mutex::new(entry)));
        }

        info!(polls = polls.len(), "tally store loaded from state file");

        Ok(Self {
            polls: RwLock::new(polls),
            state_file: Some(state_file),
            save_lock: Mutex::new(()),
        })
    }

    /// Create a poll with its (empty) dedup ledger as one atomic insert.
    ///
    /// Option texts are trimmed and blanks dropped before the length check,
    /// matching what the creation form submits.
    pub async fn create_poll(
        &self,
        question: &str,
        option_texts: Vec<String>,
        duration_minutes: i64,
        created_by: Option<String>,
    ) -> PollResult<Poll> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PollError::InvalidArgument("question must not be empty".into()));
        }

        let option_texts: Vec<String> = option_texts
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if option_texts.len() < 2 {
            return Err(PollError::InvalidArgument(
                "at least two non-empty options are required".into(),
            ));
        }

        if duration_minutes <= 0 {
            return Err(PollError::InvalidArgument(
                "duration must be a positive number of minutes".into(),
            ));
        }
        if duration_minutes > MAX_DURATION_MINUTES {
            return Err(PollError::InvalidArgument(format!(
                "duration must be at most {} minutes",
                MAX_DURATION_MINUTES
            )));
        }

        let poll = Poll::new(
            question.to_string(),
            option_texts,
            duration_minutes,
            created_by,
        );
        let entry = PollEntry {
            poll: poll.clone(),
            voters: HashSet::new(),
        };

        {
            let mut polls = self.polls.write().await;
            polls.insert(poll.id, Arc::new(Mutex::new(entry)));
        }

        info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
        self.persist_best_effort().await;
        Ok(poll)
    }

    /// Fetch a poll document by id
    pub async fn get_poll(&self, poll_id: Uuid) -> PollResult<Poll> {
        let entry = self.entry(poll_id).await?;
        let guard = entry.lock().await;
        Ok(guard.poll.clone())
    }

    /// Polls that are open per the derived predicate, oldest first
    pub async fn list_open(&self, now: DateTime<Utc>) -> Vec<Poll> {
        let mut open: Vec<Poll> = Vec::new();
        for entry in self.entries().await {
            let guard = entry.lock().await;
            if guard.poll.is_open(now) {
                open.push(guard.poll.clone());
            }
        }
        open.sort_by_key(|p| p.created_at);
        open
    }

    /// Polls created by the given opaque creator id, oldest first
    pub async fn list_by_creator(&self, creator_id: &str) -> Vec<Poll> {
        let mut owned: Vec<Poll> = Vec::new();
        for entry in self.entries().await {
            let guard = entry.lock().await;
            if guard.poll.created_by.as_deref() == Some(creator_id) {
                owned.push(guard.poll.clone());
            }
        }
        owned.sort_by_key(|p| p.created_at);
        owned
    }

    /// Every poll, active and ended, oldest first (admin read)
    pub async fn list_all(&self) -> Vec<Poll> {
        let mut all: Vec<Poll> = Vec::new();
        for entry in self.entries().await {
            let guard = entry.lock().await;
            all.push(guard.poll.clone());
        }
        all.sort_by_key(|p| p.created_at);
        all
    }

    /// Submit a vote.
    ///
    /// Preconditions in order, first failure wins: poll exists, derived-open,
    /// option belongs to the poll, voter unseen. On acceptance the returned
    /// snapshot reflects the new counts.
    ///
    /// `on_commit` runs while the per-poll lock is still held, so snapshots
    /// published from it are observed in admission order. Keep it brief and
    /// non-blocking.
    pub async fn submit_vote(
        &self,
        poll_id: Uuid,
        voter_id: &str,
        option_id: Uuid,
        now: DateTime<Utc>,
        on_commit: impl FnOnce(&TallySnapshot),
    ) -> PollResult<TallySnapshot> {
        let entry = self.entry(poll_id).await?;
        let snapshot = {
            let mut guard = Self::lock_bounded(&entry).await?;
            guard.admit(voter_id, option_id, now)?;
            let snapshot = guard.snapshot(now);
            on_commit(&snapshot);
            snapshot
        };

        self.persist_best_effort().await;
        Ok(snapshot)
    }

    /// Flip every expired-but-active poll to closed, exactly once each.
    ///
    /// `on_close` runs under the poll's lock with the closing snapshot
    /// (winners attached), so no later snapshot for that poll can follow it.
    /// Re-evaluating an already-closed poll is a no-op. A poll whose lock is
    /// contended is skipped and picked up on the next tick.
    pub async fn close_expired(
        &self,
        now: DateTime<Utc>,
        mut on_close: impl FnMut(&TallySnapshot),
    ) -> Vec<TallySnapshot> {
        let mut closed = Vec::new();

        for entry in self.entries().await {
            let Ok(mut guard) = Self::lock_bounded(&entry).await else {
                continue;
            };
            if guard.poll.is_active && guard.poll.is_expired(now) {
                guard.poll.is_active = false;
                let snapshot = guard.snapshot(now);
                info!(poll_id = %guard.poll.id, "poll closed at expiry");
                on_close(&snapshot);
                closed.push(snapshot);
            }
        }

        if !closed.is_empty() {
            self.persist_best_effort().await;
        }
        closed
    }

    /// Current tally snapshot, for the synchronous pull on initial render
    pub async fn snapshot(&self, poll_id: Uuid, now: DateTime<Utc>) -> PollResult<TallySnapshot> {
        let entry = self.entry(poll_id).await?;
        let guard = entry.lock().await;
        Ok(guard.snapshot(now))
    }

    /// Size of a poll's dedup ledger (number of accepted votes)
    pub async fn vote_record_count(&self, poll_id: Uuid) -> PollResult<usize> {
        let entry = self.entry(poll_id).await?;
        let guard = entry.lock().await;
        Ok(guard.voters.len())
    }

    async fn entry(&self, poll_id: Uuid) -> PollResult<Arc<Mutex<PollEntry>>> {
        let polls = self.polls.read().await;
        polls
            .get(&poll_id)
            .cloned()
            .ok_or(PollError::NotFound(poll_id))
    }

    async fn entries(&self) -> Vec<Arc<Mutex<PollEntry>>> {
        let polls = self.polls.read().await;
        polls.values().cloned().collect()
    }

    async fn lock_bounded(entry: &Arc<Mutex<PollEntry>>) -> PollResult<MutexGuard<'_, PollEntry>> {
        timeout(LOCK_TIMEOUT, entry.lock())
            .await
            .map_err(|_| PollError::Transient)
    }

    /// Write-through save. Durability faults are logged and isolated; the
    /// in-memory state stays authoritative.
    async fn persist_best_effort(&self) {
        let Some(state_file) = &self.state_file else {
            return;
        };

        let _save = self.save_lock.lock().await;

        let mut polls = Vec::new();
        for entry in self.entries().await {
            let guard = entry.lock().await;
            let mut voters: Vec<String> = guard.voters.iter().cloned().collect();
            voters.sort();
            polls.push(PersistedPoll {
                poll: guard.poll.clone(),
                voters,
            });
        }
        polls.sort_by_key(|p| p.poll.created_at);

        if let Err(e) = state_file.save(&StoreState { polls }) {
            error!(error = %e, "state file write-through failed");
        }
    }
}

impl Default for TallyStore {
    fn default() -> Self {
        Self::new()
    }
}
