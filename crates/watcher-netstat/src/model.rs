//! Normalized socket-table entry model shared by every decoder.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// An IP address and port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SockAddr {
    /// IPv4 or IPv6 address.
    pub ip: IpAddr,
    /// Port in host order.
    pub port: u16,
}

impl SockAddr {
    /// Creates an address/port pair.
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for SockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Connection state of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkState {
    /// State code was not recognised (only with `ReportUnknown`).
    Unknown,
    /// Connection established.
    Established,
    /// Active open, SYN sent.
    SynSent,
    /// Passive open, SYN received.
    SynRecv,
    /// Local close, waiting for FIN or ACK.
    FinWait1,
    /// Local close acknowledged, waiting for remote FIN.
    FinWait2,
    /// Waiting out the 2MSL timer.
    TimeWait,
    /// Closed, or an unconnected datagram socket.
    Close,
    /// Remote closed, waiting for the local close.
    CloseWait,
    /// Remote closed and local FIN sent.
    LastAck,
    /// Listening for connections.
    Listen,
    /// Both sides closing simultaneously.
    Closing,
}

impl SkState {
    /// Returns the netstat-style name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for SkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so callers can use width specifiers in table output.
        f.pad(self.as_str())
    }
}

/// Process owning a socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Process {
    /// Process identifier.
    pub pid: u32,
    /// Short process name; empty when it could not be read.
    pub name: String,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{}/{}", self.pid, self.name))
    }
}

/// One decoded row of a socket table.
///
/// Entries are values: fields are fixed at construction and only read
/// through accessors afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockTabEntry {
    local_addr: SockAddr,
    remote_addr: SockAddr,
    state: SkState,
    uid: u32,
    process: Option<Process>,
    /// Kernel handle joining the table row to descriptor tables.
    #[serde(skip)]
    pub(crate) inode: u64,
}

impl SockTabEntry {
    /// Creates an entry with no owning process.
    #[must_use]
    pub const fn new(local_addr: SockAddr, remote_addr: SockAddr, state: SkState, uid: u32) -> Self {
        Self {
            local_addr,
            remote_addr,
            state,
            uid,
            process: None,
            inode: 0,
        }
    }

    /// Returns the entry with its owning process set.
    #[must_use]
    pub fn with_process(mut self, process: Process) -> Self {
        self.process = Some(process);
        self
    }

    pub(crate) fn with_inode(mut self, inode: u64) -> Self {
        self.inode = inode;
        self
    }

    /// Local endpoint.
    #[must_use]
    pub const fn local_addr(&self) -> SockAddr {
        self.local_addr
    }

    /// Remote endpoint.
    #[must_use]
    pub const fn remote_addr(&self) -> SockAddr {
        self.remote_addr
    }

    /// Connection state.
    #[must_use]
    pub const fn state(&self) -> SkState {
        self.state
    }

    /// Numeric id of the user owning the socket.
    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// Owning process, if it could be determined.
    #[must_use]
    pub const fn process(&self) -> Option<&Process> {
        self.process.as_ref()
    }
}

/// Predicate deciding whether a decoded entry is kept.
///
/// Must be pure: it is called once for every candidate row, before owner
/// resolution, so `process` is always `None` when it runs on Linux.
pub type AcceptFn<'a> = &'a dyn Fn(&SockTabEntry) -> bool;

/// Predicate that accepts every entry.
#[must_use]
pub const fn accept_all(_entry: &SockTabEntry) -> bool {
    true
}

/// Address family of a socket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// IPv4.
    Inet,
    /// IPv6.
    Inet6,
}

/// Transport protocol of a socket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
}

/// One of the four socket tables the engine can enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketKind {
    /// TCP over IPv4.
    Tcp4,
    /// TCP over IPv6.
    Tcp6,
    /// UDP over IPv4.
    Udp4,
    /// UDP over IPv6.
    Udp6,
}

impl SocketKind {
    /// All kinds, in the order the CLI reports them.
    pub const ALL: [Self; 4] = [Self::Tcp4, Self::Tcp6, Self::Udp4, Self::Udp6];

    /// Returns the transport protocol.
    #[must_use]
    pub const fn protocol(self) -> Protocol {
        match self {
            Self::Tcp4 | Self::Tcp6 => Protocol::Tcp,
            Self::Udp4 | Self::Udp6 => Protocol::Udp,
        }
    }

    /// Returns the address family.
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::Tcp4 | Self::Udp4 => Family::Inet,
            Self::Tcp6 | Self::Udp6 => Family::Inet6,
        }
    }

    /// File name of the table under `/proc/net`, also used as display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tcp4 => "tcp",
            Self::Tcp6 => "tcp6",
            Self::Udp4 => "udp",
            Self::Udp6 => "udp6",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
