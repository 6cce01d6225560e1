//! Walker for Darwin `pcblist64` sysctl buffers.
//!
//! The buffer is an `xinpgen` header, a run of fixed-size records each
//! starting with its own length, and a trailing `xinpgen`. The trailing
//! header's length does not match the record size, which ends the walk.

use std::net::IpAddr;

use watcher_common::config::UnknownStatePolicy;
use watcher_common::error::{Result, WatcherError};

use super::layout::{
    self, INP_IPV4, INP_IPV6, InpcbView, XINPCB64_SIZE, XINPGEN_SIZE, XTCPCB64_INPCB,
    XTCPCB64_SIZE, XTCPCB64_T_STATE,
};
use crate::model::{Family, Protocol, SkState, SockAddr, SockTabEntry, SocketKind};
use crate::state;

/// Result of walking one pcblist buffer.
#[derive(Debug, Default)]
pub struct PcbDecode {
    /// Entries matching the requested family, in buffer order.
    pub entries: Vec<SockTabEntry>,
    /// Records dropped because their state could not be decoded.
    pub skipped: usize,
}

/// Size of one record for `protocol`.
#[must_use]
pub const fn record_size(protocol: Protocol) -> usize {
    match protocol {
        Protocol::Tcp => XTCPCB64_SIZE,
        Protocol::Udp => XINPCB64_SIZE,
    }
}

/// Validates the generation header of `buf`.
///
/// # Errors
///
/// Returns [`WatcherError::InvalidHeader`] if the buffer is shorter than an
/// `xinpgen` or its declared length is not `XINPGEN_SIZE`.
pub fn validate_header(buf: &[u8]) -> Result<()> {
    if buf.len() < XINPGEN_SIZE {
        return Err(WatcherError::InvalidHeader {
            expected: XINPGEN_SIZE,
            actual: buf.len(),
        });
    }
    let declared = layout::read_u32(buf, 0).map_or(0, |len| usize::try_from(len).unwrap_or(usize::MAX));
    if declared != XINPGEN_SIZE {
        return Err(WatcherError::InvalidHeader {
            expected: XINPGEN_SIZE,
            actual: declared,
        });
    }
    Ok(())
}

/// Decodes every record of `buf` that belongs to `kind`'s family.
///
/// # Errors
///
/// Returns [`WatcherError::InvalidHeader`] if the leading header fails
/// validation. Nothing after the header is interpreted in that case.
pub fn parse_pcblist(buf: &[u8], kind: SocketKind, policy: UnknownStatePolicy) -> Result<PcbDecode> {
    validate_header(buf)?;

    let protocol = kind.protocol();
    let expected = record_size(protocol);
    let mut decode = PcbDecode::default();
    let mut offset = XINPGEN_SIZE;

    while let Some(declared) = declared_len(buf, offset, protocol) {
        if declared == 0 || declared != expected || buf.len() - offset < declared {
            break;
        }
        let record = &buf[offset..offset + declared];
        offset += declared;

        match decode_record(record, kind, policy) {
            Ok(Some(entry)) => decode.entries.push(entry),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(table = %kind, error = %e, "dropping pcb record");
                decode.skipped += 1;
            }
        }
    }

    Ok(decode)
}

/// Reads the record's own length field: `xt_len` for TCP, `xi_len` for UDP.
fn declared_len(buf: &[u8], offset: usize, protocol: Protocol) -> Option<usize> {
    let len = match protocol {
        Protocol::Tcp => u64::from(layout::read_u32(buf, offset)?),
        // A trailing xinpgen is only 24 bytes; fall back to its u32 length.
        Protocol::Udp => layout::read_u64(buf, offset)
            .or_else(|| layout::read_u32(buf, offset).map(u64::from))?,
    };
    Some(usize::try_from(len).unwrap_or(usize::MAX))
}

/// Decodes one record, or `None` if it belongs to the other family.
fn decode_record(record: &[u8], kind: SocketKind, policy: UnknownStatePolicy) -> Result<Option<SockTabEntry>> {
    let inpcb = match kind.protocol() {
        Protocol::Tcp => &record[XTCPCB64_INPCB..],
        Protocol::Udp => record,
    };
    let Some(inp) = InpcbView::new(inpcb) else {
        return Ok(None);
    };

    let (local, remote) = match kind.family() {
        Family::Inet if inp.vflag() & INP_IPV4 != 0 => (
            IpAddr::V4(inp.local_v4()),
            IpAddr::V4(inp.foreign_v4()),
        ),
        Family::Inet6 if inp.vflag() & INP_IPV6 != 0 => (
            IpAddr::V6(inp.local_v6()),
            IpAddr::V6(inp.foreign_v6()),
        ),
        _ => return Ok(None),
    };

    let state = match kind.protocol() {
        Protocol::Tcp => {
            let code = i32::from_ne_bytes(layout::array(record, XTCPCB64_T_STATE));
            state::apply_policy(state::decode_darwin(code), policy)?
        }
        // Datagram sockets have no FSM; mirror Linux's connected/unconnected.
        Protocol::Udp if inp.foreign_port() != 0 => SkState::Established,
        Protocol::Udp => SkState::Close,
    };

    Ok(Some(SockTabEntry::new(
        SockAddr::new(local, inp.local_port()),
        SockAddr::new(remote, inp.foreign_port()),
        state,
        inp.uid(),
    )))
}
