//! livepoll - live poll lifecycle and tally broadcast engine
//!
//! An organizer publishes a poll with a fixed option set and a time-boxed
//! voting window; anonymous participants cast at most one vote each; every
//! viewer of a poll sees counts update live; the poll ends at expiry with a
//! winner (or tie) computed.

pub mod cli;
pub mod clock;
pub mod http_server;
pub mod poll;
pub mod realtime;
