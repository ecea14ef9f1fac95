//! # Store Persistence
//!
//! Write-through JSON state file for polls and the dedup ledger.
//!
//! The file is replaced atomically (write to a temp file, then rename) so a
//! crash mid-write leaves the previous state intact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{PollError, PollResult};
use super::model::Poll;

/// One poll plus its dedup ledger, as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPoll {
    pub poll: Poll,
    /// Voter ids with a recorded vote, sorted for stable output
    pub voters: Vec<String>,
}

/// Full durable state of the tally store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub polls: Vec<PersistedPoll>,
}

/// Handle to the state file on disk
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a handle; the file itself is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state; a missing file yields empty state
    pub fn load(&self) -> PollResult<StoreState> {
        if !self.path.exists() {
            return Ok(StoreState::default());
        }

        let bytes = fs::read(&self.path)
            .map_err(|e| PollError::Internal(format!("read state file: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| PollError::Internal(format!("parse state file: {}", e)))
    }

    /// Replace the state file atomically
    pub fn save(&self, state: &StoreState) -> PollResult<()> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| PollError::Internal(format!("serialize state: {}", e)))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| PollError::Internal(format!("write state file: {}", e)))?;

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| PollError::Internal(format!("rename state file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> StoreState {
        let poll = Poll::new(
            "Tea or coffee?".to_string(),
            vec!["Tea".to_string(), "Coffee".to_string()],
            5,
            Some("organizer-1".to_string()),
        );
        StoreState {
            polls: vec![PersistedPoll {
                poll,
                voters: vec!["voter-a".to_string(), "voter-b".to_string()],
            }],
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("polls.json"));
        let state = file.load().unwrap();
        assert!(state.polls.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("polls.json"));

        let state = sample_state();
        file.save(&state).unwrap();

        let loaded = file.load().unwrap();
        assert_eq!(loaded.polls.len(), 1);
        assert_eq!(loaded.polls[0].poll.question, "Tea or coffee?");
        assert_eq!(loaded.polls[0].voters.len(), 2);
    }

    #[test]
    fn test_save_replaces_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("polls.json"));

        file.save(&sample_state()).unwrap();
        file.save(&StoreState::default()).unwrap();

        let loaded = file.load().unwrap();
        assert!(loaded.polls.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        fs::write(&path, b"not json").unwrap();

        let file = StateFile::new(path);
        assert!(matches!(file.load(), Err(PollError::Internal(_))));
    }
}
