// ABOUTME: Handoff monitor module transferring the primary tracking role between peers
// ABOUTME: Pure trigger rules, the atomic role holder and the periodic monitor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Handoff
//!
//! The primary unit evaluates the rules every handoff tick and asks the
//! companion to take or return the role. A role switch commits only when the
//! companion acknowledges, except when the companion is unreachable and the
//! primary unit reclaims the role on its own.

/// Periodic evaluation and request handling
pub mod monitor;
/// Atomic role holder
pub mod role;
/// Pure trigger rules
pub mod rules;

pub use monitor::{HandoffConfig, HandoffLinks, HandoffMonitor};
pub use role::PrimaryRole;
pub use rules::{evaluate, HandoffSignals};
