// ABOUTME: Deterministic resolution of two disagreeing lifecycle states
// ABOUTME: Terminal beats stopping beats active beats starting; ties go to the GPS role holder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tandem_core::models::SessionState;

/// Which side's state wins when no other rule decides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// This device holds the primary role
    Local,
    /// The peer holds the primary role
    Remote,
}

impl Authority {
    /// The other side
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

/// Resolve the local and remote views of the session into one state
///
/// The result never leaves a terminal state and is the same whichever
/// device computes it, given each side passes its own view of `authority`.
#[must_use]
pub fn resolve(
    local: SessionState,
    remote: SessionState,
    authority: Authority,
) -> SessionState {
    if local == remote {
        return local;
    }

    match (local.is_terminal(), remote.is_terminal()) {
        (true, true) => return pick(local, remote, authority),
        (true, false) => return local,
        (false, true) => return remote,
        (false, false) => {}
    }

    if local == SessionState::Stopping || remote == SessionState::Stopping {
        return SessionState::Stopping;
    }

    match (local.is_active(), remote.is_active()) {
        // running vs paused
        (true, true) => SessionState::Running,
        (true, false) => local,
        (false, true) => remote,
        (false, false) => {
            if local.progress() > remote.progress() {
                local
            } else if remote.progress() > local.progress() {
                remote
            } else {
                pick(local, remote, authority)
            }
        }
    }
}

const fn pick(local: SessionState, remote: SessionState, authority: Authority) -> SessionState {
    match authority {
        Authority::Local => local,
        Authority::Remote => remote,
    }
}
