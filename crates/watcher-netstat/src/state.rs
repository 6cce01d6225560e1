//! Connection-state decoding.
//!
//! Each platform numbers TCP states differently. Decoders here reject any
//! code outside the platform's range; [`apply_policy`] then turns that
//! rejection into either a dropped row or [`SkState::Unknown`].

use watcher_common::config::UnknownStatePolicy;
use watcher_common::error::{Result, WatcherError};

use crate::model::SkState;

/// Linux `TCP_ESTABLISHED` .. `TCP_CLOSING`, indexed by code - 1.
const LINUX_STATES: [SkState; 11] = [
    SkState::Established,
    SkState::SynSent,
    SkState::SynRecv,
    SkState::FinWait1,
    SkState::FinWait2,
    SkState::TimeWait,
    SkState::Close,
    SkState::CloseWait,
    SkState::LastAck,
    SkState::Listen,
    SkState::Closing,
];

/// Darwin `TCPS_CLOSED` .. `TCPS_TIME_WAIT`, indexed by code.
const DARWIN_STATES: [SkState; 11] = [
    SkState::Close,
    SkState::Listen,
    SkState::SynSent,
    SkState::SynRecv,
    SkState::Established,
    SkState::CloseWait,
    SkState::FinWait1,
    SkState::Closing,
    SkState::LastAck,
    SkState::FinWait2,
    SkState::TimeWait,
];

/// Decodes the `st` column of a `/proc/net` table.
///
/// # Errors
///
/// Returns [`WatcherError::UnknownState`] for codes outside `1..=11`.
pub fn decode_linux(code: u8) -> Result<SkState> {
    usize::from(code)
        .checked_sub(1)
        .and_then(|idx| LINUX_STATES.get(idx).copied())
        .ok_or(WatcherError::UnknownState {
            code: i64::from(code),
        })
}

/// Decodes the `t_state` field of a Darwin `xtcpcb64`.
///
/// # Errors
///
/// Returns [`WatcherError::UnknownState`] for codes outside `0..=10`.
pub fn decode_darwin(code: i32) -> Result<SkState> {
    usize::try_from(code)
        .ok()
        .and_then(|idx| DARWIN_STATES.get(idx).copied())
        .ok_or(WatcherError::UnknownState {
            code: i64::from(code),
        })
}

/// Resolves a decode result according to the deployment's policy.
///
/// # Errors
///
/// With [`UnknownStatePolicy::DropRow`], the `UnknownState` error is passed
/// through so the caller drops the row. Other errors always pass through.
pub fn apply_policy(decoded: Result<SkState>, policy: UnknownStatePolicy) -> Result<SkState> {
    match (decoded, policy) {
        (Err(WatcherError::UnknownState { code }), UnknownStatePolicy::ReportUnknown) => {
            tracing::debug!(code, "reporting unrecognised state as UNKNOWN");
            Ok(SkState::Unknown)
        }
        (other, _) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_codes_cover_every_state_once() {
        assert_eq!(decode_linux(0x01).ok(), Some(SkState::Established));
        assert_eq!(decode_linux(0x07).ok(), Some(SkState::Close));
        assert_eq!(decode_linux(0x0A).ok(), Some(SkState::Listen));
        assert_eq!(decode_linux(0x0B).ok(), Some(SkState::Closing));

        let mut seen: Vec<SkState> = (1..=11).filter_map(|c| decode_linux(c).ok()).collect();
        seen.sort_by_key(|s| s.as_str());
        seen.dedup();
        assert_eq!(seen.len(), 11);
        assert!(!seen.contains(&SkState::Unknown));
    }

    #[test]
    fn linux_out_of_range_is_an_error() {
        assert!(matches!(
            decode_linux(0),
            Err(WatcherError::UnknownState { code: 0 })
        ));
        assert!(matches!(
            decode_linux(0x0C),
            Err(WatcherError::UnknownState { code: 12 })
        ));
    }

    #[test]
    fn darwin_codes_follow_tcp_fsm() {
        assert_eq!(decode_darwin(0).ok(), Some(SkState::Close));
        assert_eq!(decode_darwin(1).ok(), Some(SkState::Listen));
        assert_eq!(decode_darwin(4).ok(), Some(SkState::Established));
        assert_eq!(decode_darwin(10).ok(), Some(SkState::TimeWait));
        assert!(decode_darwin(11).is_err());
        assert!(decode_darwin(-1).is_err());
    }

    #[test]
    fn drop_row_policy_keeps_the_error() {
        let out = apply_policy(decode_linux(0x42), UnknownStatePolicy::DropRow);
        assert!(matches!(out, Err(WatcherError::UnknownState { code: 0x42 })));
    }

    #[test]
    fn report_unknown_policy_maps_to_unknown_variant() {
        let out = apply_policy(decode_linux(0x42), UnknownStatePolicy::ReportUnknown);
        assert_eq!(out.ok(), Some(SkState::Unknown));
    }

    #[test]
    fn policy_leaves_valid_states_untouched() {
        let out = apply_policy(decode_linux(0x0A), UnknownStatePolicy::ReportUnknown);
        assert_eq!(out.ok(), Some(SkState::Listen));
    }
}
