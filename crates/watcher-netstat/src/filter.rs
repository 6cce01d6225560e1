//! Caller-supplied filtering of decoded entries.

use crate::model::{AcceptFn, SockTabEntry};

/// Keeps the entries accepted by `accept`, preserving their order.
///
/// Each entry is passed to the predicate exactly once.
pub fn apply(entries: Vec<SockTabEntry>, accept: AcceptFn<'_>) -> Vec<SockTabEntry> {
    let total = entries.len();
    let kept: Vec<_> = entries.into_iter().filter(|e| accept(e)).collect();
    tracing::trace!(total, kept = kept.len(), "filter applied");
    kept
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::model::{SkState, SockAddr, accept_all};

    fn entry(port: u16, state: SkState) -> SockTabEntry {
        let local = SockAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let remote = SockAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        SockTabEntry::new(local, remote, state, 0)
    }

    #[test]
    fn listen_predicate_keeps_listeners_in_order() {
        let entries = vec![
            entry(80, SkState::Listen),
            entry(5000, SkState::Established),
            entry(443, SkState::Listen),
            entry(5001, SkState::TimeWait),
        ];
        let kept = apply(entries, &|e: &SockTabEntry| e.state() == SkState::Listen);
        let ports: Vec<_> = kept.iter().map(|e| e.local_addr().port).collect();
        assert_eq!(ports, vec![80, 443]);
    }

    #[test]
    fn accept_all_keeps_everything() {
        let entries = vec![entry(1, SkState::Close), entry(2, SkState::Established)];
        assert_eq!(apply(entries.clone(), &accept_all), entries);
    }

    #[test]
    fn predicate_runs_once_per_entry() {
        let calls = Cell::new(0_usize);
        let entries = vec![entry(1, SkState::Close), entry(2, SkState::Listen), entry(3, SkState::Listen)];
        let _ = apply(entries, &|_: &SockTabEntry| {
            calls.set(calls.get() + 1);
            true
        });
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(apply(Vec::new(), &accept_all).is_empty());
    }
}
