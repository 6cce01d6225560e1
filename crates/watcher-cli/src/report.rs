//! Formatting of capture records for the log file.

use std::fmt::Write as _;

use chrono::{DateTime, Local, SecondsFormat};
use watcher_common::constants::MAX_ADDR_DISPLAY_LEN;
use watcher_netstat::{SockAddr, SockTabEntry, SocketKind};

use crate::dns::Resolver;

/// Returns the timestamp written at the top of each capture.
pub fn timestamp(at: &DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Opening lines of a capture block: the timestamp and column titles.
pub fn table_header(at: &DateTime<Local>) -> String {
    format!(
        "🔍 Connection capture at {}\nProto {:<23} {:<23} {:<12} {:<16}\n",
        timestamp(at),
        "Local Addr",
        "Foreign Addr",
        "State",
        "PID/Program name"
    )
}

/// Appends one fixed-width row per entry.
pub fn table_rows(
    out: &mut String,
    kind: SocketKind,
    entries: &[SockTabEntry],
    mut resolver: Option<&mut Resolver>,
) {
    for entry in entries {
        let local = display_addr(entry.local_addr(), resolver.as_deref_mut());
        let remote = display_addr(entry.remote_addr(), resolver.as_deref_mut());
        let owner = entry
            .process()
            .map(ToString::to_string)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<5} {local:<23.23} {remote:<23.23} {:<12} {owner:<16}",
            kind.label(),
            entry.state(),
        );
    }
}

/// Appends one JSON object per entry, tagged with the table and time.
///
/// # Errors
///
/// Returns an error if an entry fails to serialize.
pub fn json_rows(
    out: &mut String,
    at: &DateTime<Local>,
    kind: SocketKind,
    entries: &[SockTabEntry],
) -> serde_json::Result<()> {
    let captured_at = timestamp(at);
    for entry in entries {
        let mut value = serde_json::to_value(entry)?;
        if let Some(object) = value.as_object_mut() {
            let _ = object.insert("proto".into(), kind.label().into());
            let _ = object.insert("captured_at".into(), captured_at.clone().into());
        }
        out.push_str(&serde_json::to_string(&value)?);
        out.push('\n');
    }
    Ok(())
}

/// `host:port`, with the host truncated to [`MAX_ADDR_DISPLAY_LEN`] characters.
fn display_addr(addr: SockAddr, resolver: Option<&mut Resolver>) -> String {
    let host = resolver.map_or_else(|| addr.ip.to_string(), |r| r.name_for(addr.ip));
    format!("{}:{}", truncate(&host, MAX_ADDR_DISPLAY_LEN), addr.port)
}

fn truncate(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(idx, _)| &text[..idx])
}
