//! System-wide constants and default paths.

use std::time::Duration;

/// Mount point of the Linux process filesystem.
pub const PROC_ROOT: &str = "/proc";

/// Directory under [`PROC_ROOT`] holding the socket tables.
pub const PROC_NET_DIR: &str = "net";

/// Prefix of a `/proc/<pid>/fd/<n>` link target that refers to a socket.
pub const SOCKET_LINK_PREFIX: &str = "socket:[";

/// sysctl returning the TCP connection-control-block list on macOS.
pub const SYSCTL_TCP_PCBLIST: &str = "net.inet.tcp.pcblist64";

/// sysctl returning the UDP connection-control-block list on macOS.
pub const SYSCTL_UDP_PCBLIST: &str = "net.inet.udp.pcblist64";

/// Default capture log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "capturedlogs.txt";

/// Polling intervals offered by the interactive menu.
pub const CAPTURE_INTERVALS: [(&str, Duration); 4] = [
    ("Every minute - INTENSE logging", Duration::from_secs(60)),
    ("Every 15 minutes", Duration::from_secs(15 * 60)),
    ("Every 30 minutes", Duration::from_secs(30 * 60)),
    ("Every hour", Duration::from_secs(60 * 60)),
];

/// Longest address text printed before the `:port` suffix.
pub const MAX_ADDR_DISPLAY_LEN: usize = 17;
