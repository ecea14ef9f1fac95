//! # Realtime Module
//!
//! Live-tally delivery: per-poll rooms and best-effort fan-out.
//!
//! - **Hub**: room membership and snapshot publish
//! - **Session**: one viewer connection's channel and memberships
//!
//! The hub pushes; it never replays. Late joiners fetch current state
//! through the snapshot read instead.

pub mod errors;
pub mod hub;
pub mod session;

pub use errors::{RealtimeError, RealtimeResult};
pub use hub::{BroadcastHub, PublishReport};
pub use session::{Session, SnapshotReceiver, SnapshotSender};
