//! Byte layout of the Darwin `pcblist64` sysctl records.
//!
//! Offsets follow `<netinet/in_pcb.h>` and `<netinet/tcp_var.h>` for
//! 64-bit kernels. Those structures are declared under `#pragma pack(4)`,
//! so 64-bit members are only 4-byte aligned.
//!
//! ```text
//! xinpgen   { len u32, count u32, gen u64, sogen u64 }                    24 bytes
//! xinpcb64  { xi_len u64, xi_inpp u64, fport u16, lport u16, ...,
//!             vflag u8 @92, faddr[16] @96, laddr[16] @112,
//!             xi_socket: xsocket64 @144, xi_alignment_hack u64 }        260 bytes
//! xsocket64 { ..., so_uid u32 @104 }                                     108 bytes
//! xtcpcb64  { xt_len u32, xt_inpcb: xinpcb64 @4, t_segq u64,
//!             t_dupacks i32, t_timer[4] i32, t_state i32 @292, ... }   472 bytes
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};

/// Size of `struct xinpgen`.
pub const XINPGEN_SIZE: usize = 24;
/// Size of `struct xinpcb64`.
pub const XINPCB64_SIZE: usize = 260;
/// Size of `struct xtcpcb64`.
pub const XTCPCB64_SIZE: usize = 472;

/// Offset of `xt_inpcb` within `xtcpcb64`.
pub const XTCPCB64_INPCB: usize = 4;
/// Offset of `t_state` within `xtcpcb64`.
pub const XTCPCB64_T_STATE: usize = 292;

/// Offset of `inp_fport` within `xinpcb64`.
pub const INP_FPORT: usize = 16;
/// Offset of `inp_lport` within `xinpcb64`.
pub const INP_LPORT: usize = 18;
/// Offset of `inp_vflag` within `xinpcb64`.
pub const INP_VFLAG: usize = 92;
/// Offset of the foreign address union within `xinpcb64`.
pub const INP_FADDR: usize = 96;
/// Offset of the local address union within `xinpcb64`.
pub const INP_LADDR: usize = 112;
/// Offset of `xi_socket` within `xinpcb64`.
pub const XI_SOCKET: usize = 144;
/// Offset of `so_uid` within `xsocket64`.
pub const SO_UID: usize = 104;

/// Offset of the IPv4 address inside `struct in_addr_4in6`.
pub const IN_ADDR_4IN6: usize = 12;

/// `inp_vflag` bit for IPv4 sockets.
pub const INP_IPV4: u8 = 0x1;
/// `inp_vflag` bit for IPv6 sockets.
pub const INP_IPV6: u8 = 0x2;

/// Read-only view of one `xinpcb64`.
///
/// The slice must be at least [`XINPCB64_SIZE`] bytes; the walker checks
/// this before constructing a view.
#[derive(Debug, Clone, Copy)]
pub struct InpcbView<'a> {
    bytes: &'a [u8],
}

impl<'a> InpcbView<'a> {
    /// Wraps a record slice, or returns `None` if it is too short.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < XINPCB64_SIZE {
            None
        } else {
            Some(Self { bytes })
        }
    }

    /// Foreign port, stored in network order.
    #[must_use]
    pub fn foreign_port(&self) -> u16 {
        u16::from_be_bytes(array(self.bytes, INP_FPORT))
    }

    /// Local port, stored in network order.
    #[must_use]
    pub fn local_port(&self) -> u16 {
        u16::from_be_bytes(array(self.bytes, INP_LPORT))
    }

    /// `inp_vflag` address-family bits.
    #[must_use]
    pub fn vflag(&self) -> u8 {
        self.bytes[INP_VFLAG]
    }

    /// Foreign address as IPv4 (`inp46_foreign`).
    #[must_use]
    pub fn foreign_v4(&self) -> Ipv4Addr {
        Ipv4Addr::from(array::<4>(self.bytes, INP_FADDR + IN_ADDR_4IN6))
    }

    /// Local address as IPv4 (`inp46_local`).
    #[must_use]
    pub fn local_v4(&self) -> Ipv4Addr {
        Ipv4Addr::from(array::<4>(self.bytes, INP_LADDR + IN_ADDR_4IN6))
    }

    /// Foreign address as IPv6 (`inp6_foreign`).
    #[must_use]
    pub fn foreign_v6(&self) -> Ipv6Addr {
        Ipv6Addr::from(array::<16>(self.bytes, INP_FADDR))
    }

    /// Local address as IPv6 (`inp6_local`).
    #[must_use]
    pub fn local_v6(&self) -> Ipv6Addr {
        Ipv6Addr::from(array::<16>(self.bytes, INP_LADDR))
    }

    /// `xi_socket.so_uid`.
    #[must_use]
    pub fn uid(&self) -> u32 {
        u32::from_ne_bytes(array(self.bytes, XI_SOCKET + SO_UID))
    }
}

/// Copies `N` bytes at `offset`. Callers guarantee the range is in bounds.
pub(crate) fn array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

/// Reads a native-endian `u32` at `offset`, if in bounds.
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    (end <= bytes.len()).then(|| u32::from_ne_bytes(array(bytes, offset)))
}

/// Reads a native-endian `u64` at `offset`, if in bounds.
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(8)?;
    (end <= bytes.len()).then(|| u64::from_ne_bytes(array(bytes, offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_block_fits_inside_inpcb() {
        assert!(XI_SOCKET + SO_UID + 4 <= XINPCB64_SIZE);
        assert!(XTCPCB64_INPCB + XINPCB64_SIZE <= XTCPCB64_T_STATE);
        assert!(XTCPCB64_T_STATE + 4 <= XTCPCB64_SIZE);
    }

    #[test]
    fn short_slice_has_no_view() {
        assert!(InpcbView::new(&[0u8; XINPCB64_SIZE - 1]).is_none());
        assert!(InpcbView::new(&[0u8; XINPCB64_SIZE]).is_some());
    }

    #[test]
    fn view_reads_ports_in_network_order() {
        let mut raw = vec![0u8; XINPCB64_SIZE];
        raw[INP_LPORT..INP_LPORT + 2].copy_from_slice(&8080u16.to_be_bytes());
        raw[INP_FPORT..INP_FPORT + 2].copy_from_slice(&443u16.to_be_bytes());
        raw[INP_LADDR + IN_ADDR_4IN6..INP_LADDR + 16].copy_from_slice(&[10, 0, 0, 7]);
        let view = InpcbView::new(&raw).expect("view");
        assert_eq!(view.local_port(), 8080);
        assert_eq!(view.foreign_port(), 443);
        assert_eq!(view.local_v4(), Ipv4Addr::new(10, 0, 0, 7));
    }

    #[test]
    fn bounded_reads_reject_overflow() {
        let raw = [1u8, 0, 0, 0, 2];
        assert_eq!(read_u32(&raw, 0), Some(u32::from_ne_bytes([1, 0, 0, 0])));
        assert_eq!(read_u32(&raw, 2), None);
        assert_eq!(read_u64(&raw, 0), None);
        assert_eq!(read_u32(&raw, usize::MAX), None);
    }
}
