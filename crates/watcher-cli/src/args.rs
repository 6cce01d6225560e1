//! Command-line arguments and the capture plan derived from them.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use watcher_common::config::{CaptureConfig, UnknownStatePolicy};
use watcher_common::constants::DEFAULT_LOG_FILE;
use watcher_common::error::WatcherError;
use watcher_netstat::{Family, Protocol, SkState, SockTabEntry, SocketKind, accept_all};

/// The Watcher: looks out for your network safety.
#[derive(Parser, Debug)]
#[command(name = "watcher", version, about, long_about = None)]
pub struct Cli {
    /// Display TCP sockets.
    #[arg(long)]
    pub tcp: bool,

    /// Display UDP sockets.
    #[arg(long)]
    pub udp: bool,

    /// Display only listening sockets.
    #[arg(long = "lis")]
    pub listening: bool,

    /// Display both listening and non-listening sockets.
    #[arg(long)]
    pub all: bool,

    /// Look up symbolic names for host addresses.
    #[arg(long = "res")]
    pub resolve: bool,

    /// Display only IPv4 sockets.
    #[arg(short = '4')]
    pub ipv4: bool,

    /// Display only IPv6 sockets.
    #[arg(short = '6')]
    pub ipv6: bool,

    /// Path to the log file.
    #[arg(long = "saveto", default_value = DEFAULT_LOG_FILE)]
    pub log_path: PathBuf,

    /// Capture interval (e.g. `90s`, `15m`, `1h`); skips the interactive menu.
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Take a single capture and exit.
    #[arg(long)]
    pub once: bool,

    /// Log file record format.
    #[arg(long, value_enum, default_value_t = LogFormat::Table)]
    pub format: LogFormat,

    /// Keep rows with unrecognised state codes, reported as UNKNOWN.
    #[arg(long)]
    pub report_unknown: bool,

    /// Scan process directories one at a time when resolving owners.
    #[arg(long)]
    pub sequential_scan: bool,
}

/// Layout of the records appended to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Fixed-width table, one block per capture.
    Table,
    /// One JSON object per socket.
    Json,
}

impl Cli {
    /// Socket tables to capture, in display order.
    ///
    /// TCP is captured unless only `--udp` was given; UDP only with
    /// `--udp`. Neither `-4` nor `-6` means both families.
    pub fn kinds(&self) -> Vec<SocketKind> {
        let want_tcp = self.tcp || !self.udp;
        let want_v4 = self.ipv4 || !self.ipv6;
        let want_v6 = self.ipv6 || !self.ipv4;

        SocketKind::ALL
            .into_iter()
            .filter(|kind| match kind.protocol() {
                Protocol::Tcp => want_tcp,
                Protocol::Udp => self.udp,
            })
            .filter(|kind| match kind.family() {
                Family::Inet => want_v4,
                Family::Inet6 => want_v6,
            })
            .collect()
    }

    /// Row predicate for `kind`.
    ///
    /// Listening filters only apply to TCP; UDP tables are always taken
    /// whole.
    pub fn predicate(&self, kind: SocketKind) -> fn(&SockTabEntry) -> bool {
        if kind.protocol() == Protocol::Udp || self.all {
            accept_all
        } else if self.listening {
            is_listening
        } else {
            is_not_listening
        }
    }

    /// Engine configuration selected by the flags.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            unknown_state: if self.report_unknown {
                UnknownStatePolicy::ReportUnknown
            } else {
                UnknownStatePolicy::DropRow
            },
            parallel_owner_scan: !self.sequential_scan,
        }
    }
}

fn is_listening(entry: &SockTabEntry) -> bool {
    entry.state() == SkState::Listen
}

fn is_not_listening(entry: &SockTabEntry) -> bool {
    entry.state() != SkState::Listen
}

/// Parses `<n>`, `<n>s`, `<n>m` or `<n>h` into a non-zero duration.
fn parse_interval(raw: &str) -> Result<Duration, WatcherError> {
    let invalid = |message: String| WatcherError::Config { message };
    let raw = raw.trim();
    let (digits, scale) = match raw.char_indices().last() {
        Some((idx, 's')) => (&raw[..idx], 1),
        Some((idx, 'm')) => (&raw[..idx], 60),
        Some((idx, 'h')) => (&raw[..idx], 60 * 60),
        _ => (raw, 1),
    };
    let count: u64 = digits
        .parse()
        .map_err(|e| invalid(format!("interval {raw:?}: {e}")))?;
    if count == 0 {
        return Err(invalid("interval must be greater than zero".into()));
    }
    count
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(format!("interval {raw:?} is too large")))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use watcher_netstat::SockAddr;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("watcher").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    fn entry(state: SkState) -> SockTabEntry {
        let addr = SockAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 80);
        SockTabEntry::new(addr, addr, state, 0)
    }

    #[test]
    fn defaults_capture_tcp_on_both_families() {
        let cli = cli(&[]);
        assert_eq!(cli.kinds(), vec![SocketKind::Tcp4, SocketKind::Tcp6]);
        assert_eq!(cli.log_path, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(cli.format, LogFormat::Table);
        assert!(cli.interval.is_none());
    }

    #[test]
    fn udp_alone_drops_tcp() {
        assert_eq!(cli(&["--udp"]).kinds(), vec![SocketKind::Udp4, SocketKind::Udp6]);
        assert_eq!(cli(&["--udp", "--tcp", "-6"]).kinds(), vec![
            SocketKind::Tcp6,
            SocketKind::Udp6
        ]);
    }

    #[test]
    fn both_family_flags_keep_both() {
        assert_eq!(cli(&["-4", "-6"]).kinds(), vec![SocketKind::Tcp4, SocketKind::Tcp6]);
        assert_eq!(cli(&["-4"]).kinds(), vec![SocketKind::Tcp4]);
    }

    #[test]
    fn default_predicate_hides_listeners() {
        let accept = cli(&[]).predicate(SocketKind::Tcp4);
        assert!(!accept(&entry(SkState::Listen)));
        assert!(accept(&entry(SkState::Established)));
    }

    #[test]
    fn listening_predicate_keeps_only_listeners() {
        let accept = cli(&["--lis"]).predicate(SocketKind::Tcp6);
        assert!(accept(&entry(SkState::Listen)));
        assert!(!accept(&entry(SkState::TimeWait)));
    }

    #[test]
    fn all_and_udp_accept_everything() {
        let all = cli(&["--all", "--lis"]).predicate(SocketKind::Tcp4);
        assert!(all(&entry(SkState::Listen)) && all(&entry(SkState::Established)));

        let udp = cli(&["--lis"]).predicate(SocketKind::Udp4);
        assert!(udp(&entry(SkState::Close)));
    }

    #[test]
    fn config_flags_map_to_capture_config() {
        assert_eq!(cli(&[]).capture_config(), CaptureConfig::default());
        let config = cli(&["--report-unknown", "--sequential-scan"]).capture_config();
        assert_eq!(config.unknown_state, UnknownStatePolicy::ReportUnknown);
        assert!(!config.parallel_owner_scan);
    }

    #[test]
    fn intervals_accept_units() {
        assert_eq!(parse_interval("45").ok(), Some(Duration::from_secs(45)));
        assert_eq!(parse_interval("90s").ok(), Some(Duration::from_secs(90)));
        assert_eq!(parse_interval("15m").ok(), Some(Duration::from_secs(900)));
        assert_eq!(parse_interval("1h").ok(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn intervals_reject_zero_and_garbage() {
        assert!(matches!(parse_interval("0m"), Err(WatcherError::Config { .. })));
        assert!(matches!(parse_interval("soon"), Err(WatcherError::Config { .. })));
        assert!(matches!(parse_interval(""), Err(WatcherError::Config { .. })));
        assert!(Cli::try_parse_from(["watcher", "--interval", "0"]).is_err());
    }

    #[test]
    fn interval_flag_parses() {
        assert_eq!(cli(&["--interval", "30m", "--once"]).interval, Some(Duration::from_secs(1800)));
    }
}
