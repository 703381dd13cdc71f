//! poolctl - fee ledger CLI tool
//!
//! Read-only command-line access to the records persisted by the
//! poolwatch ingestion daemon.

use poolwatch::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
