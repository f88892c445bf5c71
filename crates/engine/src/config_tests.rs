// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_are_valid() {
    let config = EngineConfig::default();
    config.validate().unwrap();
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
    assert!(config.idle_threshold() < config.destroy_threshold());
}

#[yare::parameterized(
    idle_equals_destroy = { 600, 600 },
    idle_above_destroy  = { 900, 600 },
)]
fn idle_must_be_below_destroy(idle: u64, destroy: u64) {
    let config = EngineConfig {
        idle_threshold_secs: idle,
        destroy_threshold_secs: destroy,
        ..EngineConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    assert!(err.to_string().contains("idle threshold"), "got: {}", err);
}

#[test]
fn default_timeout_cannot_exceed_max() {
    let config = EngineConfig {
        default_exec_timeout_ms: 10_000,
        max_exec_timeout_ms: 5_000,
        ..EngineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn tiny_observer_buffer_is_rejected() {
    let config = EngineConfig {
        observer_buffer: 1,
        ..EngineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn partial_toml_fills_defaults() {
    let config: EngineConfig = toml::from_str("idle_threshold_secs = 5\nobserver_buffer = 8\n").unwrap();
    assert_eq!(config.idle_threshold_secs, 5);
    assert_eq!(config.observer_buffer, 8);
    assert_eq!(config.destroy_threshold_secs, EngineConfig::default().destroy_threshold_secs);
}
