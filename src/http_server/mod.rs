//! # HTTP Server Module
//!
//! The serving layer over the poll core. Contains no poll logic: handlers
//! map requests onto store/hub operations and core errors onto status codes
//! with stable reason codes.
//!
//! # Endpoints
//!
//! - `POST /api/polls` - create a poll
//! - `GET  /api/polls` - list open polls
//! - `GET  /api/polls/by-creator/{creator_id}` - polls by creator
//! - `GET  /api/polls/{id}/snapshot` - current tally pull
//! - `POST /api/polls/{id}/vote` - submit a vote
//! - `GET  /api/admin/polls` - all polls (bearer-token predicate)
//! - `GET  /api/realtime/ws` - WebSocket subscriptions

pub mod config;
pub mod poll_routes;
pub mod realtime_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::{AppState, HttpServer};
