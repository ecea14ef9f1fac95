//! # Poll Core
//!
//! The authoritative poll lifecycle state machine:
//!
//! - **Model**: poll documents, options, tally snapshots
//! - **Store**: per-poll serialized vote admission and the one-way close
//! - **Winner**: pure winner/tie resolution over final counts
//! - **Persist**: write-through JSON state file

pub mod errors;
pub mod model;
pub mod persist;
pub mod store;
pub mod winner;

pub use errors::{PollError, PollResult};
pub use model::{Poll, PollOption, TallySnapshot};
pub use persist::{StateFile, StoreState};
pub use store::TallyStore;
pub use winner::resolve_winners;
