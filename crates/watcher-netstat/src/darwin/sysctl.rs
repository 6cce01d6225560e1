//! `sysctlbyname` access to the pcblist tables.

use watcher_common::error::{Result, WatcherError};

fn unavailable(name: &str, source: std::io::Error) -> WatcherError {
    WatcherError::SourceUnavailable {
        source_name: name.to_string(),
        source,
    }
}

/// Fetches the raw buffer behind a pcblist sysctl.
///
/// The table can grow between the size query and the read, so the buffer
/// is over-allocated by an eighth.
///
/// # Errors
///
/// Returns [`WatcherError::SourceUnavailable`] if either `sysctlbyname`
/// call fails.
#[cfg(target_os = "macos")]
#[allow(unsafe_code)]
pub fn read_pcblist(name: &str) -> Result<Vec<u8>> {
    use std::ffi::CString;
    use std::ptr;

    let c_name = CString::new(name)
        .map_err(|e| unavailable(name, std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let mut len: libc::size_t = 0;
    // SAFETY: a null output buffer asks the kernel for the required size only;
    // `c_name` is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe {
        libc::sysctlbyname(c_name.as_ptr(), ptr::null_mut(), &mut len, ptr::null_mut(), 0)
    };
    if rc != 0 {
        return Err(unavailable(name, std::io::Error::last_os_error()));
    }

    let mut buf = vec![0u8; len + len / 8];
    let mut len = buf.len();
    // SAFETY: `buf` is writable for `len` bytes and the kernel writes at most
    // `len` bytes, updating `len` with the amount written.
    let rc = unsafe {
        libc::sysctlbyname(
            c_name.as_ptr(),
            buf.as_mut_ptr().cast(),
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return Err(unavailable(name, std::io::Error::last_os_error()));
    }
    buf.truncate(len);
    tracing::debug!(sysctl = name, bytes = len, "read pcblist");
    Ok(buf)
}

/// Stub for platforms without `sysctlbyname`.
///
/// # Errors
///
/// Always returns [`WatcherError::SourceUnavailable`].
#[cfg(not(target_os = "macos"))]
pub fn read_pcblist(name: &str) -> Result<Vec<u8>> {
    Err(unavailable(
        name,
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "pcblist sysctls are only available on macOS",
        ),
    ))
}
