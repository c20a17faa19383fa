// ABOUTME: Property-style tests for lifecycle conflict resolution
// ABOUTME: Both peers must reach the same state from swapped views of a divergence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use tandem::session::{resolve, Authority};
use tandem_core::models::SessionState;

#[test]
fn test_agreement_resolves_to_itself() {
    for state in SessionState::ALL {
        for authority in [Authority::Local, Authority::Remote] {
            assert_eq!(resolve(state, state, authority), state);
        }
    }
}

#[test]
fn test_both_peers_converge_on_the_same_state() {
    for local in SessionState::ALL {
        for remote in SessionState::ALL {
            for authority in [Authority::Local, Authority::Remote] {
                let here = resolve(local, remote, authority);
                let there = resolve(remote, local, authority.flipped());
                assert_eq!(here, there, "{local} vs {remote} with {authority:?}");
            }
        }
    }
}

#[test]
fn test_terminal_state_is_never_left() {
    for terminal in [SessionState::Stopped, SessionState::Completed] {
        for other in SessionState::ALL {
            let resolved = resolve(terminal, other, Authority::Remote);
            assert!(resolved.is_terminal(), "{terminal} vs {other} gave {resolved}");
        }
    }
}

#[test]
fn test_stopping_wins_over_active_states() {
    for other in [SessionState::Running, SessionState::Paused, SessionState::Starting] {
        assert_eq!(
            resolve(SessionState::Stopping, other, Authority::Remote),
            SessionState::Stopping
        );
        assert_eq!(
            resolve(other, SessionState::Stopping, Authority::Local),
            SessionState::Stopping
        );
    }
}

#[test]
fn test_running_wins_over_paused() {
    assert_eq!(
        resolve(SessionState::Paused, SessionState::Running, Authority::Local),
        SessionState::Running
    );
    assert_eq!(
        resolve(SessionState::Running, SessionState::Paused, Authority::Remote),
        SessionState::Running
    );
}

#[test]
fn test_active_state_wins_over_starting() {
    assert_eq!(
        resolve(SessionState::Starting, SessionState::Paused, Authority::Local),
        SessionState::Paused
    );
}

#[test]
fn test_two_terminal_states_follow_the_role_holder() {
    assert_eq!(
        resolve(SessionState::Stopped, SessionState::Completed, Authority::Local),
        SessionState::Stopped
    );
    assert_eq!(
        resolve(SessionState::Stopped, SessionState::Completed, Authority::Remote),
        SessionState::Completed
    );
}
