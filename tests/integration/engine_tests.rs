//! End-to-end engine scenarios on the mock hardware.

use boardguard::app::engine::{
    RECOVERY_POWER_PULSE_MS, RECOVERY_RESET_PULSE_MS, RECOVERY_SETTLE_MS,
};
use boardguard::app::events::WatchdogEvent;
use boardguard::app::ports::{Level, OutputLine};
use boardguard::app::WatchdogEngine;
use boardguard::config::BoardConfig;

use crate::mock_hw::{MockHw, RecordingSink};

fn boot(config: &BoardConfig, hw: &mut MockHw) -> (WatchdogEngine, RecordingSink) {
    let mut sink = RecordingSink::default();
    let engine = WatchdogEngine::new(config, 0, hw, &mut sink);
    hw.writes.clear();
    hw.delays.clear();
    sink.events.clear();
    (engine, sink)
}

#[test]
fn stale_heartbeat_triggers_recovery_at_the_timeout() {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    hw.heartbeat = Level::High; // held high from boot, never toggles
    let (mut engine, mut sink) = boot(&config, &mut hw);

    // Evaluations happen once per poll interval.
    for t in (1_001..10_001).step_by(1_000) {
        engine.tick(t, &mut hw, &mut sink);
    }
    assert_eq!(sink.count_lockups(), 0, "still inside the timeout");

    engine.tick(10_001, &mut hw, &mut sink);
    assert!(sink.events.contains(&WatchdogEvent::LockupDetected {
        at_ms: 10_001,
        heartbeat: 1,
        power_on: true,
    }));

    // Power press, settle, reset press.
    assert_eq!(hw.writes_to(OutputLine::Power), vec![Level::High, Level::Low]);
    assert_eq!(hw.writes_to(OutputLine::Reset), vec![Level::High, Level::Low]);
    let power_idx = hw
        .writes
        .iter()
        .position(|w| *w == (OutputLine::Power, Level::High))
        .unwrap();
    let reset_idx = hw
        .writes
        .iter()
        .position(|w| *w == (OutputLine::Reset, Level::High))
        .unwrap();
    assert!(power_idx < reset_idx, "power press comes first");

    // Both pulses plus the settle waits, nothing more.
    assert_eq!(
        hw.total_delay_ms(),
        RECOVERY_POWER_PULSE_MS + 200 + u64::from(RECOVERY_SETTLE_MS) + RECOVERY_RESET_PULSE_MS + 200
    );

    // The cooldown window opens at the recovery.
    assert_eq!(engine.cooldown_ends_at(), 10_001 + config.cooldown_ms);
}

#[test]
fn cooldown_suppresses_a_second_recovery() {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    let (mut engine, mut sink) = boot(&config, &mut hw);

    for t in (1_001..=30_001).step_by(1_000) {
        engine.tick(t, &mut hw, &mut sink);
    }

    assert_eq!(sink.count_lockups(), 1, "cooldown holds the second one back");
    assert!(sink.events.contains(&WatchdogEvent::CooldownActive {
        at_ms: 21_001,
        remaining_ms: config.cooldown_ms - 11_000,
    }));
}

#[test]
fn regular_toggling_never_trips_the_watchdog() {
    let mut config = BoardConfig::default();
    config.poll_interval_ms = 500;
    let mut hw = MockHw::healthy();
    let (mut engine, mut sink) = boot(&config, &mut hw);

    // Heartbeat flips every 500ms, well inside the 10s timeout.
    for t in 1..=12_000u64 {
        if t % 500 == 0 {
            hw.toggle_heartbeat();
        }
        engine.tick(t, &mut hw, &mut sink);
    }

    assert_eq!(sink.count_lockups(), 0);
    assert!(hw.writes.is_empty());
    // The tenth observed toggle (t=5000, seen at 5001) armed the
    // debounce and pinned the cooldown end to that moment.
    assert_eq!(engine.cooldown_ends_at(), 5_001);
}

#[test]
fn recovered_heartbeat_collapses_the_cooldown() {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    let (mut engine, mut sink) = boot(&config, &mut hw);

    // First recovery at 10_001 opens the two-minute window.
    for t in (1_001..=10_001).step_by(1_000) {
        engine.tick(t, &mut hw, &mut sink);
    }
    assert_eq!(sink.count_lockups(), 1);

    // The board comes back and toggles once per poll.
    for t in (11_001..=20_001).step_by(1_000) {
        hw.toggle_heartbeat();
        engine.tick(t, &mut hw, &mut sink);
    }
    assert!(sink
        .events
        .contains(&WatchdogEvent::CooldownCollapsed { at_ms: 20_001 }));
    assert_eq!(engine.cooldown_ends_at(), 20_001);

    // It hangs again: with the window collapsed the watchdog may act.
    for t in (21_001..=31_001).step_by(1_000) {
        engine.tick(t, &mut hw, &mut sink);
    }
    assert_eq!(sink.count_lockups(), 2);
}

#[test]
fn disabled_engine_observes_but_never_pulses() {
    let mut config = BoardConfig::default();
    config.enabled = false;
    let mut hw = MockHw::healthy();
    let (mut engine, mut sink) = boot(&config, &mut hw);

    for t in (1_001..=10_001).step_by(1_000) {
        engine.tick(t, &mut hw, &mut sink);
    }

    assert_eq!(sink.count_lockups(), 1);
    assert!(sink
        .events
        .contains(&WatchdogEvent::ObserveOnly { at_ms: 10_001 }));
    assert!(hw.writes.is_empty());
    // The cooldown still opens, so a re-enable does not fire instantly.
    assert_eq!(engine.cooldown_ends_at(), 10_001 + config.cooldown_ms);
}

#[test]
fn power_loss_fires_on_the_first_evaluation() {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    hw.power = Level::Low;
    let (mut engine, mut sink) = boot(&config, &mut hw);

    engine.tick(1_001, &mut hw, &mut sink);

    assert!(sink.events.contains(&WatchdogEvent::LockupDetected {
        at_ms: 1_001,
        heartbeat: 0,
        power_on: false,
    }));
}

#[test]
fn reconfigure_applies_new_thresholds_to_the_running_engine() {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    let (mut engine, mut sink) = boot(&config, &mut hw);

    let mut tighter = config.clone();
    tighter.lockup_timeout_ms = 3_000;
    engine.reconfigure(&tighter);

    engine.tick(1_001, &mut hw, &mut sink);
    engine.tick(2_001, &mut hw, &mut sink);
    assert_eq!(sink.count_lockups(), 0);
    engine.tick(3_001, &mut hw, &mut sink);
    assert_eq!(sink.count_lockups(), 1);
}
