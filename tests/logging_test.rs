// ABOUTME: Tests for logging configuration loaded from the environment
// ABOUTME: Format parsing, defaults and environment overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use serial_test::serial;
use tandem::logging::{LogFormat, LoggingConfig};
use tandem_core::constants::service_names;

const LOGGING_KEYS: [&str; 4] = ["RUST_LOG", "LOG_FORMAT", "LOG_INCLUDE_LOCATION", "SERVICE_NAME"];

fn clear_env() {
    for key in LOGGING_KEYS {
        env::remove_var(key);
    }
}

#[test]
fn test_default_logging_config() {
    let config = LoggingConfig::default();

    assert_eq!(config.level, "info");
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.service_name, service_names::TANDEM_COORDINATOR);
    assert!(!config.include_location);
}

#[test]
fn test_format_parsing_falls_back_to_pretty() {
    assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
    assert_eq!(LogFormat::from_str_or_default("compact"), LogFormat::Compact);
    assert_eq!(LogFormat::from_str_or_default("fancy"), LogFormat::Pretty);
}

#[test]
#[serial]
fn test_logging_config_from_env() {
    clear_env();
    env::set_var("RUST_LOG", "debug");
    env::set_var("LOG_FORMAT", "json");
    env::set_var("LOG_INCLUDE_LOCATION", "1");
    env::set_var("SERVICE_NAME", "tandem-test");

    let config = LoggingConfig::from_env();
    clear_env();

    assert_eq!(config.level, "debug");
    assert_eq!(config.format, LogFormat::Json);
    assert!(config.include_location);
    assert_eq!(config.service_name, "tandem-test");
}
