//! Decoder for the `/proc/net/{tcp,tcp6,udp,udp6}` text tables.
//!
//! A data row looks like:
//!
//! ```text
//!   0: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345 1 ...
//! ```
//!
//! The slot, both endpoints, and the state are parsed with `nom`. The
//! remaining columns are plain whitespace-separated values of which only
//! `uid` and `inode` are kept.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use nom::{
    IResult, Parser,
    character::complete::{char, digit1, hex_digit1, space0, space1},
    sequence::{preceded, separated_pair, terminated},
};
use watcher_common::config::UnknownStatePolicy;
use watcher_common::error::{Result, WatcherError};

use crate::model::{Family, SockAddr, SockTabEntry, SocketKind};
use crate::state;

/// Columns after the state: `tx:rx tr:when retrnsmt uid timeout inode`.
const TRAILING_FIELDS: usize = 6;
const UID_FIELD: usize = 3;
const INODE_FIELD: usize = 5;

/// Result of decoding one table.
#[derive(Debug, Default)]
pub struct TableDecode {
    /// Entries in file order, without owning process.
    pub entries: Vec<SockTabEntry>,
    /// Rows that were dropped because they failed to decode.
    pub malformed: usize,
}

/// Decodes a whole table, skipping its header.
///
/// A row that fails to decode is dropped and counted in
/// [`TableDecode::malformed`]; decoding continues with the next row.
pub fn parse_table(content: &str, kind: SocketKind, policy: UnknownStatePolicy) -> TableDecode {
    let mut decode = TableDecode::default();
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line, idx + 1, kind.family(), policy) {
            Ok(entry) => decode.entries.push(entry),
            Err(e) => {
                tracing::debug!(table = %kind, error = %e, "dropping socket row");
                decode.malformed += 1;
            }
        }
    }
    decode
}

/// Decodes a single data row.
///
/// # Errors
///
/// Returns [`WatcherError::MalformedRow`] if any kept field fails to
/// decode, or [`WatcherError::UnknownState`] if the state code is out of
/// range and the policy says to drop the row.
pub fn parse_row(
    line: &str,
    line_no: usize,
    family: Family,
    policy: UnknownStatePolicy,
) -> Result<SockTabEntry> {
    let malformed = |reason: String| WatcherError::MalformedRow {
        line: line_no,
        reason,
    };

    let (rest, (local, remote, st)) =
        row_head(line).map_err(|e| malformed(format!("unparsable row head: {e}")))?;

    let local_addr = decode_endpoint(local, family).map_err(&malformed)?;
    let remote_addr = decode_endpoint(remote, family).map_err(&malformed)?;

    let code = u8::from_str_radix(st, 16).map_err(|e| malformed(format!("state {st:?}: {e}")))?;
    let state = state::apply_policy(state::decode_linux(code), policy)?;

    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < TRAILING_FIELDS {
        return Err(malformed(format!(
            "expected at least {TRAILING_FIELDS} trailing fields, got {}",
            fields.len()
        )));
    }
    let uid = fields[UID_FIELD]
        .parse::<u32>()
        .map_err(|e| malformed(format!("uid {:?}: {e}", fields[UID_FIELD])))?;
    let inode = fields[INODE_FIELD]
        .parse::<u64>()
        .map_err(|e| malformed(format!("inode {:?}: {e}", fields[INODE_FIELD])))?;

    Ok(SockTabEntry::new(local_addr, remote_addr, state, uid).with_inode(inode))
}

type Endpoint<'a> = (&'a str, &'a str);

/// `sl:` slot number with its leading padding.
fn slot(input: &str) -> IResult<&str, &str> {
    preceded(space0, terminated(digit1, char(':'))).parse(input)
}

/// `ADDR:PORT` with both halves in hex.
fn endpoint(input: &str) -> IResult<&str, Endpoint<'_>> {
    separated_pair(hex_digit1, char(':'), hex_digit1).parse(input)
}

fn row_head(input: &str) -> IResult<&str, (Endpoint<'_>, Endpoint<'_>, &str)> {
    let (input, _) = slot(input)?;
    let (input, local) = preceded(space1, endpoint).parse(input)?;
    let (input, remote) = preceded(space1, endpoint).parse(input)?;
    let (input, st) = state_code(input)?;
    Ok((input, (local, remote, st)))
}

fn state_code(input: &str) -> IResult<&str, &str> {
    preceded(space1, hex_digit1).parse(input)
}

fn decode_endpoint((addr, port): Endpoint<'_>, family: Family) -> std::result::Result<SockAddr, String> {
    let ip = match family {
        Family::Inet => decode_ipv4(addr).map(IpAddr::V4),
        Family::Inet6 => decode_ipv6(addr).map(IpAddr::V6),
    }
    .ok_or_else(|| format!("address {addr:?} is not a {family:?} hex block"))?;

    if port.len() > 4 {
        return Err(format!("port {port:?} wider than 16 bits"));
    }
    let port = u16::from_str_radix(port, 16).map_err(|e| format!("port {port:?}: {e}"))?;
    Ok(SockAddr::new(ip, port))
}

/// Decodes one 32-bit word stored in host (little-endian) byte order.
fn decode_word(hex: &str) -> Option<[u8; 4]> {
    u32::from_str_radix(hex, 16).ok().map(u32::to_le_bytes)
}

/// Decodes the 8-hex-digit IPv4 form, e.g. `0100007F` for `127.0.0.1`.
pub fn decode_ipv4(hex: &str) -> Option<Ipv4Addr> {
    if hex.len() != 8 {
        return None;
    }
    decode_word(hex).map(Ipv4Addr::from)
}

/// Decodes the 32-hex-digit IPv6 form.
///
/// The kernel prints the address as four 32-bit words, each in host byte
/// order, so every word is reversed on its own.
pub fn decode_ipv6(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 || !hex.is_ascii() {
        return None;
    }
    let mut octets = [0u8; 16];
    for (idx, chunk) in octets.chunks_exact_mut(4).enumerate() {
        let start = idx * 8;
        chunk.copy_from_slice(&decode_word(&hex[start..start + 8])?);
    }
    Some(Ipv6Addr::from(octets))
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use super::*;
    use crate::model::SkState;

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    fn tcp_row(slot: usize, local: &str, remote: &str, st: &str, uid: u32, inode: u64) -> String {
        format!(
            "{slot:>4}: {local} {remote} {st} 00000000:00000000 00:00000000 00000000 {uid:>5}        0 {inode} 1 0000000000000000 100 0 0 10 0"
        )
    }

    fn encode_ipv4(ip: Ipv4Addr) -> String {
        format!("{:08X}", u32::from_le_bytes(ip.octets()))
    }

    fn encode_ipv6(ip: Ipv6Addr) -> String {
        let mut out = String::new();
        for word in ip.octets().chunks_exact(4) {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            let _ = write!(out, "{word:08X}");
        }
        out
    }

    #[test]
    fn header_only_table_is_empty() {
        let decode = parse_table(HEADER, SocketKind::Tcp4, UnknownStatePolicy::DropRow);
        assert!(decode.entries.is_empty());
        assert_eq!(decode.malformed, 0);
    }

    #[test]
    fn rows_decode_in_file_order() {
        let table = [
            HEADER.to_string(),
            tcp_row(0, "0100007F:0050", "00000000:0000", "0A", 0, 1111),
            tcp_row(1, "0100007F:1F90", "0100007F:C350", "01", 1000, 2222),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp4, UnknownStatePolicy::DropRow);
        assert_eq!(decode.malformed, 0);
        assert_eq!(decode.entries.len(), 2);

        let first = &decode.entries[0];
        assert_eq!(first.local_addr().to_string(), "127.0.0.1:80");
        assert_eq!(first.remote_addr().to_string(), "0.0.0.0:0");
        assert_eq!(first.state(), SkState::Listen);
        assert_eq!(first.inode, 1111);
        assert!(first.process().is_none());

        let second = &decode.entries[1];
        assert_eq!(second.local_addr().port, 8080);
        assert_eq!(second.remote_addr().port, 50000);
        assert_eq!(second.state(), SkState::Established);
        assert_eq!(second.uid(), 1000);
        assert_eq!(second.inode, 2222);
    }

    #[test]
    fn corrupt_row_does_not_affect_neighbours() {
        let table = [
            HEADER.to_string(),
            tcp_row(0, "0100007F:0050", "00000000:0000", "0A", 0, 1),
            tcp_row(1, "0100ZZ7F:0050", "00000000:0000", "0A", 0, 2),
            "   2: 0100007F".to_string(),
            tcp_row(3, "0100007F:01BB", "00000000:0000", "0A", 0, 4),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp4, UnknownStatePolicy::DropRow);
        assert_eq!(decode.malformed, 2);
        let ports: Vec<_> = decode.entries.iter().map(|e| e.local_addr().port).collect();
        assert_eq!(ports, vec![80, 443]);
    }

    #[test]
    fn truncated_address_is_malformed() {
        let line = tcp_row(0, "0100007:0050", "00000000:0000", "0A", 0, 1);
        let err = parse_row(&line, 2, Family::Inet, UnknownStatePolicy::DropRow);
        assert!(matches!(err, Err(WatcherError::MalformedRow { line: 2, .. })));
    }

    #[test]
    fn missing_inode_column_is_malformed() {
        let line = "   0: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000 0";
        let err = parse_row(line, 2, Family::Inet, UnknownStatePolicy::DropRow);
        assert!(matches!(err, Err(WatcherError::MalformedRow { .. })));
    }

    #[test]
    fn unknown_state_drops_row_by_default() {
        let table = [
            HEADER.to_string(),
            tcp_row(0, "0100007F:0050", "00000000:0000", "0C", 0, 1),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp4, UnknownStatePolicy::DropRow);
        assert!(decode.entries.is_empty());
        assert_eq!(decode.malformed, 1);
    }

    #[test]
    fn unknown_state_can_be_reported() {
        let table = [
            HEADER.to_string(),
            tcp_row(0, "0100007F:0050", "00000000:0000", "0C", 0, 1),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp4, UnknownStatePolicy::ReportUnknown);
        assert_eq!(decode.malformed, 0);
        assert_eq!(decode.entries[0].state(), SkState::Unknown);
    }

    #[test]
    fn ipv6_rows_use_per_word_reversal() {
        // ::1 as printed by the kernel on little-endian hosts.
        let table = [
            HEADER.to_string(),
            tcp_row(
                0,
                "00000000000000000000000001000000:0016",
                "00000000000000000000000000000000:0000",
                "0A",
                0,
                9,
            ),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp6, UnknownStatePolicy::DropRow);
        assert_eq!(decode.entries.len(), 1);
        assert_eq!(decode.entries[0].local_addr().ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(decode.entries[0].local_addr().port, 22);
    }

    #[test]
    fn ipv4_block_in_ipv6_table_is_malformed() {
        let table = [
            HEADER.to_string(),
            tcp_row(0, "0100007F:0050", "00000000:0000", "0A", 0, 1),
        ]
        .join("\n");
        let decode = parse_table(&table, SocketKind::Tcp6, UnknownStatePolicy::DropRow);
        assert!(decode.entries.is_empty());
        assert_eq!(decode.malformed, 1);
    }

    #[test]
    fn hex_addresses_round_trip() {
        let v4 = Ipv4Addr::new(192, 168, 1, 20);
        assert_eq!(encode_ipv4(v4), "1401A8C0");
        assert_eq!(decode_ipv4(&encode_ipv4(v4)), Some(v4));

        let v6: Ipv6Addr = "2001:db8::8a2e:370:7334".parse().expect("ipv6 literal");
        assert_eq!(decode_ipv6(&encode_ipv6(v6)), Some(v6));
        assert_eq!(
            encode_ipv6(v6),
            "B80D0120000000002E8A000034737003"
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let table = format!(
            "{HEADER}\n{}\n\n",
            tcp_row(0, "0100007F:0050", "00000000:0000", "0A", 0, 1)
        );
        let decode = parse_table(&table, SocketKind::Tcp4, UnknownStatePolicy::DropRow);
        assert_eq!(decode.entries.len(), 1);
        assert_eq!(decode.malformed, 0);
    }
}
