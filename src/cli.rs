//! CLI for the poll server
//!
//! Parses arguments, wires the store, hub, lifecycle clock, and HTTP server
//! together, and runs the serving loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::clock::{ClockConfig, LifecycleClock};
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::poll::{PollResult, StateFile, TallyStore};
use crate::realtime::BroadcastHub;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "livepoll", about = "Live poll lifecycle and tally broadcast engine")]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// JSON state file for durable polls; omit for in-memory only
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Bearer token for the admin listing; omit to disable admin routes
    #[arg(long)]
    pub admin_token: Option<String>,

    /// Seconds between lifecycle expiry scans
    #[arg(long, default_value_t = 1)]
    pub tick_interval_secs: u64,

    /// Allowed CORS origin; repeatable. Defaults to local dev origins.
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}

impl Cli {
    fn server_config(&self) -> HttpServerConfig {
        let mut config = HttpServerConfig {
            host: self.host.clone(),
            port: self.port,
            admin_token: self.admin_token.clone(),
            ..Default::default()
        };
        if !self.cors_origins.is_empty() {
            config.cors_origins = self.cors_origins.clone();
        }
        config
    }
}

/// Parse arguments and run the server until it stops
pub async fn run() -> PollResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = match &cli.state_file {
        Some(path) => TallyStore::with_state_file(StateFile::new(path))?,
        None => TallyStore::new(),
    };
    let store = Arc::new(store);
    let hub = Arc::new(BroadcastHub::new());

    let clock = Arc::new(LifecycleClock::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        ClockConfig {
            tick_interval_secs: cli.tick_interval_secs,
        },
    ));
    let clock_task = tokio::spawn({
        let clock = Arc::clone(&clock);
        async move { clock.run().await }
    });

    let server = HttpServer::new(cli.server_config(), store, hub);
    let result = server.start().await;

    clock.shutdown();
    let _ = clock_task.await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["livepoll"]);
        assert_eq!(cli.port, 5000);
        assert_eq!(cli.tick_interval_secs, 1);
        assert!(cli.state_file.is_none());
    }

    #[test]
    fn test_server_config_from_args() {
        let cli = Cli::parse_from([
            "livepoll",
            "--port",
            "8080",
            "--cors-origin",
            "https://polls.example.com",
        ]);
        let config = cli.server_config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["https://polls.example.com"]);
    }
}
