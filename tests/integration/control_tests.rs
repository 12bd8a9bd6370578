//! Control-surface dispatch tests over the in-memory storage backend.

use boardguard::adapters::log_sink::RingLog;
use boardguard::adapters::storage::NvsConfigStore;
use boardguard::app::ports::{ConfigError, ConfigPort, Level, OutputLine};
use boardguard::app::WatchdogEngine;
use boardguard::config::BoardConfig;
use boardguard::control::{
    ControlContext, ControlRequest, CONTROL_RESET_PULSE_MS, CONTROL_SHUTDOWN_PULSE_MS,
};

use crate::mock_hw::MockHw;

fn setup() -> (ControlContext<NvsConfigStore>, MockHw, RingLog) {
    let config = BoardConfig::default();
    let mut hw = MockHw::healthy();
    hw.heartbeat = Level::High;
    let mut log = RingLog::new();
    let engine = WatchdogEngine::new(&config, 0, &mut hw, &mut log);
    hw.writes.clear();
    hw.delays.clear();
    log.drain_all();
    let storage = NvsConfigStore::new().unwrap();
    (ControlContext::new(engine, config, storage), hw, log)
}

#[test]
fn status_reports_the_sampled_levels() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(&ControlRequest::Status, 100, &mut hw, &mut log);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "heartbeat=1 power=1");
}

#[test]
fn reset_command_pulses_the_reset_line() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(&ControlRequest::Reset, 100, &mut hw, &mut log);
    assert_eq!(resp.status, 200);
    assert!(resp.body.is_empty());
    assert_eq!(hw.writes_to(OutputLine::Reset), vec![Level::High, Level::Low]);
    assert!(hw.writes_to(OutputLine::Power).is_empty());
    assert_eq!(hw.total_delay_ms(), CONTROL_RESET_PULSE_MS + 200);
}

#[test]
fn shutdown_command_holds_the_power_line() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(&ControlRequest::Shutdown, 100, &mut hw, &mut log);
    assert_eq!(resp.status, 200);
    assert_eq!(hw.writes_to(OutputLine::Power), vec![Level::High, Level::Low]);
    assert_eq!(hw.total_delay_ms(), CONTROL_SHUTDOWN_PULSE_MS + 200);
}

#[test]
fn set_enabled_flips_the_engine_and_persists() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(&ControlRequest::SetEnabled(false), 100, &mut hw, &mut log);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "enabled=false");
    assert!(!ctx.engine.is_enabled());

    let stored = ctx.storage.load().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.config_version, 1);
}

#[test]
fn replace_config_adopts_and_persists_new_thresholds() {
    let (mut ctx, mut hw, mut log) = setup();
    let body = r#"{"BoardConfig":{"lockup_timeout_ms":20000,"cooldown_ms":30000}}"#;
    let resp = ctx.dispatch(
        &ControlRequest::ReplaceConfig(body.to_owned()),
        100,
        &mut hw,
        &mut log,
    );
    assert_eq!(resp.status, 200);
    assert_eq!(ctx.config.lockup_timeout_ms, 20_000);
    assert_eq!(ctx.config.cooldown_ms, 30_000);

    let stored = ctx.storage.load().unwrap();
    assert_eq!(stored.lockup_timeout_ms, 20_000);
}

#[test]
fn replace_config_rejects_malformed_documents() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(
        &ControlRequest::ReplaceConfig("{not json".to_owned()),
        100,
        &mut hw,
        &mut log,
    );
    assert_eq!(resp.status, 400);
    // Nothing changed, nothing persisted.
    assert_eq!(ctx.config, BoardConfig::default());
    assert_eq!(ctx.storage.load(), Err(ConfigError::NotFound));
}

#[test]
fn replace_config_rejects_unusable_values() {
    let (mut ctx, mut hw, mut log) = setup();
    let resp = ctx.dispatch(
        &ControlRequest::ReplaceConfig(r#"{"BoardConfig":{"poll_interval_ms":0}}"#.to_owned()),
        100,
        &mut hw,
        &mut log,
    );
    assert_eq!(resp.status, 400);
    assert_eq!(ctx.config.poll_interval_ms, 1_000);
}

#[test]
fn log_drain_is_newest_first_and_one_shot() {
    let (mut ctx, mut hw, mut log) = setup();
    log.push_line(1_000, "boot complete");
    ctx.dispatch(&ControlRequest::Reset, 2_000, &mut hw, &mut log);

    let resp = ctx.dispatch(&ControlRequest::Log, 3_000, &mut hw, &mut log);
    assert_eq!(resp.status, 200);
    let lines: Vec<&str> = resp.body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("reset pulse"));
    assert!(lines[1].contains("boot complete"));

    let resp = ctx.dispatch(&ControlRequest::Log, 4_000, &mut hw, &mut log);
    assert_eq!(resp.body, "");
}
