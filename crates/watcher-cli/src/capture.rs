//! The capture loop: one snapshot per interval, appended to the log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use watcher_netstat::SocketTable;

use crate::args::{Cli, LogFormat};
use crate::dns::Resolver;
use crate::{menu, report};

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Runs the watcher until interrupted, or for a single capture with `--once`.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or written, the
/// interval menu fails, or the signal handler cannot be installed.
pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    eprintln!("👀 The Watcher is here to look out for your network safety.");

    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_path)
        .with_context(|| format!("could not open log file {}", cli.log_path.display()))?;

    if !nix::unistd::geteuid().is_root() {
        eprintln!(
            "{YELLOW}Heads up!{RESET} Some processes might not be visible. Run as admin for full visibility."
        );
    }

    let interval = if cli.once {
        Duration::ZERO
    } else if let Some(every) = cli.interval {
        every
    } else {
        match menu::choose_interval().context("interval menu failed")? {
            Some(every) => every,
            None => {
                eprintln!("\n👋 You closed the program. See you next time.");
                return Ok(());
            }
        }
    };

    let table = SocketTable::new(cli.capture_config());
    tracing::info!(
        source = table.source_name(),
        log = %cli.log_path.display(),
        interval_secs = interval.as_secs(),
        "watcher activated"
    );
    eprintln!("{BOLD}Watcher ACTIVATED.{RESET}");

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    loop {
        let now = Local::now();
        let block = capture_cycle(&table, cli, &now)?;
        append(&mut log, &block)?;
        eprintln!(
            "{GREEN}✅{RESET} The Watcher successfully captured the current connections at {}.",
            now.format("%-I.%M %p")
        );

        if cli.once {
            return Ok(());
        }
        eprintln!("👀 The Watcher is active. Press Ctrl+C anytime to stop.");

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    eprintln!("\n👋 The Watcher is shutting down. See you next time.");
    Ok(())
}

/// Captures every requested table and renders one log block.
///
/// A table that cannot be read is skipped for this cycle.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn capture_cycle(table: &SocketTable, cli: &Cli, now: &DateTime<Local>) -> anyhow::Result<String> {
    let mut resolver = cli.resolve.then(Resolver::new);
    let mut block = match cli.format {
        LogFormat::Table => report::table_header(now),
        LogFormat::Json => String::new(),
    };

    for kind in cli.kinds() {
        let accept = cli.predicate(kind);
        let entries = match table.capture(kind, &accept) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(table = %kind, error = %e, "skipping socket table this cycle");
                continue;
            }
        };
        match cli.format {
            LogFormat::Table => report::table_rows(&mut block, kind, &entries, resolver.as_mut()),
            LogFormat::Json => report::json_rows(&mut block, now, kind, &entries)
                .with_context(|| format!("failed to serialize {kind} entries"))?,
        }
    }
    Ok(block)
}

fn append(log: &mut File, block: &str) -> anyhow::Result<()> {
    log.write_all(block.as_bytes())
        .and_then(|()| log.flush())
        .context("failed to write to log file")
}
