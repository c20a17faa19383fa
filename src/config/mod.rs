// ABOUTME: Configuration module for the coordination core
// ABOUTME: Environment-driven settings with defaults from tandem-core constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment configuration loader
pub mod environment;

pub use environment::CoordinatorConfig;
