// ABOUTME: Atomic holder of the device class currently owning the primary tracking role
// ABOUTME: Shared by the handoff monitor, the session synchronizer and the inbound handler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicU8, Ordering};

use tandem_core::models::DeviceClass;

use crate::session::Authority;

/// Which peer class currently owns GPS-class metrics
#[derive(Debug)]
pub struct PrimaryRole {
    holder: AtomicU8,
}

impl PrimaryRole {
    /// Role initially held by `class`
    #[must_use]
    pub const fn new(class: DeviceClass) -> Self {
        Self {
            holder: AtomicU8::new(class.to_u8()),
        }
    }

    /// Current holder
    #[must_use]
    pub fn current(&self) -> DeviceClass {
        DeviceClass::from_u8(self.holder.load(Ordering::SeqCst))
    }

    /// Move the role to `class`; returns whether the holder changed
    pub fn set(&self, class: DeviceClass) -> bool {
        self.holder.swap(class.to_u8(), Ordering::SeqCst) != class.to_u8()
    }

    /// Tie-break authority as seen from a device of class `local`
    #[must_use]
    pub fn authority_for(&self, local: DeviceClass) -> Authority {
        if self.current() == local {
            Authority::Local
        } else {
            Authority::Remote
        }
    }
}
