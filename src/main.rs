//! livepoll entry point
//!
//! Minimal: argument parsing, wiring, and the serving loop all live in the
//! CLI module; main only reports the terminal error.

use livepoll::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
