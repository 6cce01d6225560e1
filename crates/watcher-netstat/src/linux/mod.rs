//! Linux socket tables via the proc filesystem.
//!
//! Capture is two-phase: decode and filter the `/proc/net` table, then run
//! one owner scan over the inodes that survived the filter.

pub mod owner;
pub mod table;

use std::path::{Path, PathBuf};

use watcher_common::config::CaptureConfig;
use watcher_common::constants::{PROC_NET_DIR, PROC_ROOT};
use watcher_common::error::{Result, WatcherError};

use crate::filter;
use crate::model::{AcceptFn, SockTabEntry, SocketKind};
use crate::source::TableSource;

/// Reads socket tables and descriptor links under a proc root.
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl ProcfsSource {
    /// Creates a source reading the system's `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    /// Creates a source reading an alternative proc root.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the proc root this source reads.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the text table for `kind`.
    #[must_use]
    pub fn table_path(&self, kind: SocketKind) -> PathBuf {
        self.root.join(PROC_NET_DIR).join(kind.label())
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSource for ProcfsSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn capture(
        &self,
        kind: SocketKind,
        accept: AcceptFn<'_>,
        config: &CaptureConfig,
    ) -> Result<Vec<SockTabEntry>> {
        let path = self.table_path(kind);
        let content =
            std::fs::read_to_string(&path).map_err(|e| WatcherError::SourceUnavailable {
                source_name: path.display().to_string(),
                source: e,
            })?;

        let decoded = table::parse_table(&content, kind, config.unknown_state);
        let kept = filter::apply(decoded.entries, accept);
        let entries = owner::attach_owners(kept, &self.root, config.parallel_owner_scan);

        tracing::info!(
            table = %kind,
            entries = entries.len(),
            malformed = decoded.malformed,
            "captured procfs socket table"
        );
        Ok(entries)
    }
}
