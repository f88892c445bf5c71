// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_both_readings() {
    let clock = FakeClock::new();
    let start_instant = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - start_instant, Duration::from_secs(90));
    assert_eq!(clock.epoch_ms() - start_ms, 90_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(5));
    assert_eq!(clock.epoch_ms(), other.epoch_ms());

    other.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}
