//! Darwin socket tables via the `net.inet.{tcp,udp}.pcblist64` sysctls.
//!
//! The kernel embeds the owning uid in every record, so no resolution
//! pass runs here. It does not bind records to a PID, and entries from
//! this source always have `process: None`.

pub mod layout;
pub mod pcblist;
pub mod sysctl;

use watcher_common::config::CaptureConfig;
use watcher_common::constants::{SYSCTL_TCP_PCBLIST, SYSCTL_UDP_PCBLIST};
use watcher_common::error::Result;

use crate::filter;
use crate::model::{AcceptFn, Protocol, SockTabEntry, SocketKind};
use crate::source::TableSource;

/// Reads connection-control-block lists through `sysctlbyname`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcblistSource;

impl PcblistSource {
    /// Creates the source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// sysctl name holding the table for `kind`. Both families share one list.
    #[must_use]
    pub const fn sysctl_name(kind: SocketKind) -> &'static str {
        match kind.protocol() {
            Protocol::Tcp => SYSCTL_TCP_PCBLIST,
            Protocol::Udp => SYSCTL_UDP_PCBLIST,
        }
    }
}

impl TableSource for PcblistSource {
    fn name(&self) -> &'static str {
        "pcblist"
    }

    fn capture(
        &self,
        kind: SocketKind,
        accept: AcceptFn<'_>,
        config: &CaptureConfig,
    ) -> Result<Vec<SockTabEntry>> {
        let buf = sysctl::read_pcblist(Self::sysctl_name(kind))?;
        let decoded = pcblist::parse_pcblist(&buf, kind, config.unknown_state)?;
        let entries = filter::apply(decoded.entries, accept);

        tracing::info!(
            table = %kind,
            entries = entries.len(),
            skipped = decoded.skipped,
            "captured pcblist socket table"
        );
        Ok(entries)
    }
}
