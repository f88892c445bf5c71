// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn stats_text() {
    let stats = StatsView {
        active_sessions: 2,
        idle_sessions: 1,
        destroyed_sessions: 4,
        total_created: 7,
        total_destroyed: 4,
        uptime_secs: 7_260,
    };

    let mut out = Vec::new();
    format_stats(&mut out, &stats);

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Sessions:   2 active, 1 idle, 4 destroyed\n\
         Created:    7\n\
         Destroyed:  4\n\
         Uptime:     2h\n"
    );
}
