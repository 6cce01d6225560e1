//! # watcher-netstat
//!
//! Socket-table enumeration engine for The Watcher.
//!
//! Four operations enumerate TCP/UDP sockets over IPv4/IPv6 and return
//! normalized [`SockTabEntry`] records:
//! - **Linux**: `/proc/net/{tcp,tcp6,udp,udp6}` decoded as text, owners
//!   resolved afterwards from `/proc/<pid>/fd`.
//! - **macOS**: `net.inet.{tcp,udp}.pcblist64` decoded as fixed binary
//!   records; the owning uid comes with each record.
//!
//! Every call is self-contained: the raw table is read, decoded, filtered
//! with the caller's [`AcceptFn`], and, on Linux, the owners of the
//! surviving entries are resolved in a single scan.

pub mod darwin;
pub mod filter;
pub mod linux;
pub mod model;
pub mod source;
pub mod state;

use watcher_common::config::CaptureConfig;
use watcher_common::error::Result;

pub use crate::model::{
    AcceptFn, Family, Process, Protocol, SkState, SockAddr, SockTabEntry, SocketKind, accept_all,
};
use crate::source::{TableSource, detect_source};

/// Handle bound to the platform source chosen at construction.
pub struct SocketTable {
    source: Box<dyn TableSource>,
    config: CaptureConfig,
}

impl SocketTable {
    /// Creates a table reader for the running platform.
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self::with_source(detect_source(), config)
    }

    /// Creates a table reader over an explicit source.
    #[must_use]
    pub fn with_source(source: Box<dyn TableSource>, config: CaptureConfig) -> Self {
        tracing::debug!(source = source.name(), "socket table source selected");
        Self { source, config }
    }

    /// Returns the name of the underlying source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Returns the capture configuration.
    #[must_use]
    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Enumerates the sockets of `kind` accepted by `accept`.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the raw table cannot be obtained, or
    /// `InvalidHeader` if a binary table fails validation.
    pub fn capture(&self, kind: SocketKind, accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
        self.source.capture(kind, accept, &self.config)
    }

    /// TCP sockets over IPv4.
    ///
    /// # Errors
    ///
    /// See [`SocketTable::capture`].
    pub fn tcp4(&self, accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
        self.capture(SocketKind::Tcp4, accept)
    }

    /// TCP sockets over IPv6.
    ///
    /// # Errors
    ///
    /// See [`SocketTable::capture`].
    pub fn tcp6(&self, accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
        self.capture(SocketKind::Tcp6, accept)
    }

    /// UDP sockets over IPv4.
    ///
    /// # Errors
    ///
    /// See [`SocketTable::capture`].
    pub fn udp4(&self, accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
        self.capture(SocketKind::Udp4, accept)
    }

    /// UDP sockets over IPv6.
    ///
    /// # Errors
    ///
    /// See [`SocketTable::capture`].
    pub fn udp6(&self, accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
        self.capture(SocketKind::Udp6, accept)
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

/// TCP/IPv4 sockets with the default configuration.
///
/// # Errors
///
/// See [`SocketTable::capture`].
pub fn tcp_socks(accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
    SocketTable::default().tcp4(accept)
}

/// TCP/IPv6 sockets with the default configuration.
///
/// # Errors
///
/// See [`SocketTable::capture`].
pub fn tcp6_socks(accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
    SocketTable::default().tcp6(accept)
}

/// UDP/IPv4 sockets with the default configuration.
///
/// # Errors
///
/// See [`SocketTable::capture`].
pub fn udp_socks(accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
    SocketTable::default().udp4(accept)
}

/// UDP/IPv6 sockets with the default configuration.
///
/// # Errors
///
/// See [`SocketTable::capture`].
pub fn udp6_socks(accept: AcceptFn<'_>) -> Result<Vec<SockTabEntry>> {
    SocketTable::default().udp6(accept)
}
