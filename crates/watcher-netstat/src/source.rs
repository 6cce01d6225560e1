//! Platform socket-table source abstraction.

use watcher_common::config::CaptureConfig;
use watcher_common::error::{Result, WatcherError};

use crate::model::{AcceptFn, SockTabEntry, SocketKind};

/// Decodes one platform's raw socket table into entries.
///
/// Implementors own the whole pipeline for their platform: obtaining the
/// raw table, decoding it, filtering with `accept`, and attaching owners
/// where the platform allows it.
pub trait TableSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Captures the current table for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::SourceUnavailable`] if the raw table cannot
    /// be obtained, or [`WatcherError::InvalidHeader`] if a binary table
    /// fails validation. Row and owner failures never surface here.
    fn capture(
        &self,
        kind: SocketKind,
        accept: AcceptFn<'_>,
        config: &CaptureConfig,
    ) -> Result<Vec<SockTabEntry>>;
}

/// Source for platforms with no socket-table backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSource;

impl TableSource for UnsupportedSource {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn capture(
        &self,
        kind: SocketKind,
        _accept: AcceptFn<'_>,
        _config: &CaptureConfig,
    ) -> Result<Vec<SockTabEntry>> {
        Err(WatcherError::SourceUnavailable {
            source_name: kind.label().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "no socket table backend for this platform",
            ),
        })
    }
}

/// Picks the source for the running platform.
#[must_use]
pub fn detect_source() -> Box<dyn TableSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(crate::linux::ProcfsSource::new())
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(crate::darwin::PcblistSource::new())
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Box::new(UnsupportedSource)
    }
}
