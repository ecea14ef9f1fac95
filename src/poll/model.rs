//! # Poll Data Model
//!
//! Poll documents, options, and the derived tally snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One answer option within a poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    /// Unique within the owning poll
    pub id: Uuid,

    /// Display text, non-empty
    pub text: String,

    /// Vote counter, monotonically non-decreasing
    pub votes: u64,
}

impl PollOption {
    /// Create a fresh option with a zero counter
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            votes: 0,
        }
    }
}

/// A poll document
///
/// Read-mostly after creation: only the option counters and the one-way
/// `is_active` flip mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    /// Globally unique, assigned at creation
    pub id: Uuid,

    /// Question text, immutable
    pub question: String,

    /// Ordered option set, fixed at creation, length >= 2
    pub options: Vec<PollOption>,

    /// Opaque creator identifier; anonymous creation is permitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Voting window length in minutes, positive
    pub duration_minutes: i64,

    /// `created_at + duration_minutes`
    pub expires_at: DateTime<Utc>,

    /// Flipped true -> false by the lifecycle clock, never reversed
    pub is_active: bool,
}

impl Poll {
    /// Create a new poll; inputs are assumed validated by the store
    pub fn new(
        question: String,
        option_texts: Vec<String>,
        duration_minutes: i64,
        created_by: Option<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question,
            options: option_texts.into_iter().map(PollOption::new).collect(),
            created_by,
            created_at,
            duration_minutes,
            expires_at: created_at + Duration::minutes(duration_minutes),
            is_active: true,
        }
    }

    /// Derived-open predicate, the authoritative "can still vote" check.
    ///
    /// `is_active` may lag real time between clock ticks, so the expiry
    /// timestamp is consulted as well.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }

    /// Whether the voting window has passed, regardless of `is_active`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Look up an option by id
    pub fn option(&self, option_id: Uuid) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Look up an option by id, mutably
    pub fn option_mut(&mut self, option_id: Uuid) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }
}

/// Point-in-time view of a poll's tally
///
/// Derived on demand, delivered to subscribers, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallySnapshot {
    /// Poll this snapshot belongs to; subscribers key on it to tell
    /// concurrently joined rooms apart
    pub poll_id: Uuid,

    /// Derived-open state at snapshot time
    pub is_open: bool,

    /// Option counts in the poll's own display order
    pub options: Vec<PollOption>,

    /// Winner set; present only once the poll has closed
    /// (one entry = outright winner, two or more = tie)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<Uuid>>,

    /// Snapshot timestamp
    pub generated_at: DateTime<Utc>,
}

impl TallySnapshot {
    /// Snapshot of a poll that is still accepting votes
    pub fn open(poll_id: Uuid, options: Vec<PollOption>) -> Self {
        Self {
            poll_id,
            is_open: true,
            options,
            winners: None,
            generated_at: Utc::now(),
        }
    }

    /// Closing snapshot with the final winner set attached
    pub fn closed(poll_id: Uuid, options: Vec<PollOption>, winners: Vec<Uuid>) -> Self {
        Self {
            poll_id,
            is_open: false,
            options,
            winners: Some(winners),
            generated_at: Utc::now(),
        }
    }
}
