// ABOUTME: Session state synchronizer module
// ABOUTME: Lifecycle resolution, the replica store and cross-peer synchronization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Deterministic conflict resolution
pub mod resolve;
/// Live replica and archive
pub mod store;
/// Cross-peer lifecycle replication
pub mod synchronizer;

pub use resolve::{resolve, Authority};
pub use store::SessionStore;
pub use synchronizer::{state_message, Reconciled, SessionStateSynchronizer, StateTransition};
