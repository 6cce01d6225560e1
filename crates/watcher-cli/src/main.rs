//! # watcher: The Watcher CLI
//!
//! Periodically captures the host's open TCP/UDP connections and the
//! processes owning them, appending each snapshot to a log file.

mod args;
mod capture;
mod dns;
mod menu;
mod report;

use clap::Parser;

use crate::args::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    capture::execute(&cli)
}
