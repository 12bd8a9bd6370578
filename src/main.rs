//! BoardGuard firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  GpioAdapter     RingLog       NvsConfigStore   BoardClock   │
//! │  (Gpio+Delay)    (EventSink)   (ConfigPort)     (uptime)     │
//! │  WifiService     EspHttpServer                               │
//! │  (STA + AP)      (control surface)                           │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │   WatchdogEngine + ControlContext (pure logic)        │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One mutex guards the engine, config, storage, pins, and ring log.
//! The main loop and every HTTP handler take it in turn, so commands
//! and supervision ticks never interleave mid-pulse.

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{info, warn};

use boardguard::adapters::gpio::{ButtonLine, GpioAdapter};
use boardguard::adapters::log_sink::RingLog;
use boardguard::adapters::storage::NvsConfigStore;
use boardguard::adapters::time::BoardClock;
use boardguard::adapters::wifi::{WifiService, MAX_CONNECT_ATTEMPTS};
use boardguard::app::ports::{ConfigError, ConfigPort};
use boardguard::app::WatchdogEngine;
use boardguard::config::BoardConfig;
use boardguard::control::ControlContext;
use boardguard::drivers::button::{ButtonDriver, ButtonEvent};
use boardguard::pins;

/// Everything behind the single lock.
struct Shared {
    ctx: ControlContext<NvsConfigStore>,
    gpio: GpioAdapter,
    log: RingLog,
    clock: BoardClock,
}

#[cfg(target_os = "espidf")]
type SharedState = Arc<Mutex<Shared>>;

/// Main-loop pacing; well under the engine's poll interval.
const LOOP_SLEEP_MS: u32 = 50;

fn load_or_default(storage: &mut NvsConfigStore) -> BoardConfig {
    match storage.load() {
        Ok(cfg) => {
            info!("Config loaded (v{})", cfg.config_version);
            cfg
        }
        Err(ConfigError::NotFound) => {
            info!("No stored config, seeding defaults");
            let cfg = BoardConfig::default();
            if let Err(err) = storage.save(&cfg) {
                warn!("Could not persist default config: {err}");
            }
            cfg
        }
        Err(err) => {
            warn!("Config load failed ({err}), using defaults");
            BoardConfig::default()
        }
    }
}

fn bring_up_network(wifi: &mut WifiService, cfg: &BoardConfig) {
    if cfg.wifi_ssid.is_empty() {
        info!("No station credentials, raising hotspot '{}'", cfg.hotspot_ssid);
    } else if wifi
        .connect_with_retries(&cfg.wifi_ssid, &cfg.wifi_password, MAX_CONNECT_ATTEMPTS)
        .is_ok()
    {
        return;
    } else {
        warn!("Station connect failed, raising hotspot '{}'", cfg.hotspot_ssid);
    }
    if let Err(err) = wifi.start_access_point(&cfg.hotspot_ssid, &cfg.hotspot_password) {
        warn!("Hotspot failed too ({err}); control surface unreachable");
    }
}

/// Supervision pass shared by target and simulation builds: one engine
/// tick plus the two local buttons.
fn run_loop_pass(
    shared: &mut Shared,
    reset_btn: &mut ButtonDriver,
    flash_btn: &mut ButtonDriver,
) -> bool {
    let Shared {
        ctx,
        gpio,
        log,
        clock,
    } = shared;
    let now = clock.uptime_ms();

    ctx.engine.tick(now, gpio, log);

    let level = gpio.read_button(ButtonLine::Reset);
    if reset_btn.poll(now, level) == Some(ButtonEvent::ShortPress) {
        info!("Manual reset button pressed");
        ctx.engine
            .send_reset(now, pins::MANUAL_RESET_PULSE_MS, gpio, log);
    }

    let level = gpio.read_button(ButtonLine::Flash);
    if flash_btn.poll(now, level) == Some(ButtonEvent::LongHold) {
        warn!("Factory reset: erasing stored config");
        log.push_line(now, "factory reset requested");
        if let Err(err) = ctx.storage.erase() {
            warn!("Config erase failed: {err}");
        }
        return true;
    }
    false
}

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::IOPin;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("BoardGuard v{} starting", env!("CARGO_PKG_VERSION"));

    let peripherals =
        Peripherals::take().map_err(|e| anyhow::anyhow!("peripherals taken: {e}"))?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut storage = NvsConfigStore::new()
        .map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let config = load_or_default(&mut storage);

    // `Peripherals` exposes pins only as typed fields, so the numeric
    // map cannot select them; this keeps the two in lockstep.
    const _: () = assert!(
        pins::HEARTBEAT_GPIO == 16
            && pins::POWER_SENSE_GPIO == 17
            && pins::RESET_OUT_GPIO == 14
            && pins::POWER_OUT_GPIO == 13
            && pins::RESET_BUTTON_GPIO == 5
            && pins::FLASH_BUTTON_GPIO == 0
    );
    let mut gpio = GpioAdapter::new(
        peripherals.pins.gpio16.downgrade(),
        peripherals.pins.gpio17.downgrade(),
        peripherals.pins.gpio14.downgrade(),
        peripherals.pins.gpio13.downgrade(),
        peripherals.pins.gpio5.downgrade(),
        peripherals.pins.gpio0.downgrade(),
    )?;

    let mut wifi = WifiService::new(peripherals.modem, sysloop, nvs_partition)?;
    bring_up_network(&mut wifi, &config);

    let clock = BoardClock::new();
    let mut log = RingLog::new();
    let engine = WatchdogEngine::new(&config, clock.uptime_ms(), &mut gpio, &mut log);

    let server_port = config.server_port;
    let shared: SharedState = Arc::new(Mutex::new(Shared {
        ctx: ControlContext::new(engine, config, storage),
        gpio,
        log,
        clock,
    }));

    // Server handles keep the routes alive for the life of main.
    let _server = http::start_server(server_port, Arc::clone(&shared))?;

    let mut reset_btn = ButtonDriver::new(u64::from(pins::FACTORY_RESET_HOLD_MS));
    let mut flash_btn = ButtonDriver::new(u64::from(pins::FACTORY_RESET_HOLD_MS));

    loop {
        if let Ok(mut guard) = shared.lock() {
            if run_loop_pass(&mut guard, &mut reset_btn, &mut flash_btn) {
                drop(guard);
                unsafe { esp_idf_svc::sys::esp_restart() };
            }
        }
        FreeRtos::delay_ms(LOOP_SLEEP_MS);
    }
}

#[cfg(target_os = "espidf")]
mod http {
    //! HTTP control surface over the shared state.

    use anyhow::{anyhow, Result};
    use esp_idf_svc::http::server::{Configuration, EspHttpServer, Method};
    use esp_idf_svc::io::{Read, Write};

    use boardguard::control::{ControlRequest, ControlResponse};

    use super::{Shared, SharedState};

    const MAX_CONFIG_BODY: usize = 2048;

    pub fn start_server(port: u16, shared: SharedState) -> Result<EspHttpServer<'static>> {
        let mut server = EspHttpServer::new(&Configuration {
            http_port: port,
            ..Configuration::default()
        })?;

        route(&mut server, "/status", Method::Get, &shared, |_| {
            Some(ControlRequest::Status)
        })?;
        route(&mut server, "/log", Method::Get, &shared, |_| {
            Some(ControlRequest::Log)
        })?;
        route(&mut server, "/reset", Method::Get, &shared, |_| {
            Some(ControlRequest::Reset)
        })?;
        route(&mut server, "/shutdown", Method::Get, &shared, |_| {
            Some(ControlRequest::Shutdown)
        })?;
        route(&mut server, "/enable", Method::Get, &shared, |uri| {
            parse_on_flag(uri).map(ControlRequest::SetEnabled)
        })?;

        // Config replacement carries a body, so it gets its own handler.
        let config_shared = SharedState::clone(&shared);
        server.fn_handler::<anyhow::Error, _>("/config", Method::Post, move |mut req| {
            let mut body = Vec::new();
            let mut buf = [0u8; 256];
            loop {
                let n = req.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_CONFIG_BODY {
                    let mut resp = req.into_status_response(400)?;
                    resp.write_all(b"config document too large")?;
                    return Ok(());
                }
                body.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8(body)
                .map_err(|_| anyhow!("config body is not UTF-8"))?;
            let response =
                dispatch_locked(&config_shared, &ControlRequest::ReplaceConfig(text))?;
            send(req, &response)
        })?;

        Ok(server)
    }

    fn route(
        server: &mut EspHttpServer<'static>,
        uri: &str,
        method: Method,
        shared: &SharedState,
        to_request: impl Fn(&str) -> Option<ControlRequest> + Send + 'static,
    ) -> Result<()> {
        let shared = SharedState::clone(shared);
        server.fn_handler::<anyhow::Error, _>(uri, method, move |req| {
            let Some(request) = to_request(req.uri()) else {
                let mut resp = req.into_status_response(400)?;
                resp.write_all(b"bad request")?;
                return Ok(());
            };
            let response = dispatch_locked(&shared, &request)?;
            send(req, &response)
        })?;
        Ok(())
    }

    fn dispatch_locked(shared: &SharedState, request: &ControlRequest) -> Result<ControlResponse> {
        let mut guard = shared.lock().map_err(|_| anyhow!("state lock poisoned"))?;
        let Shared {
            ctx,
            gpio,
            log,
            clock,
        } = &mut *guard;
        let now = clock.uptime_ms();
        Ok(ctx.dispatch(request, now, gpio, log))
    }

    fn send(
        req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection>,
        response: &ControlResponse,
    ) -> Result<()> {
        let mut resp = req.into_status_response(response.status)?;
        resp.write_all(response.body.as_bytes())?;
        Ok(())
    }

    /// `/enable?on=1` or `/enable?on=0` (also accepts true/false).
    fn parse_on_flag(uri: &str) -> Option<bool> {
        let query = uri.split_once('?')?.1;
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("on=") {
                return match value {
                    "1" | "true" => Some(true),
                    "0" | "false" => Some(false),
                    _ => None,
                };
            }
        }
        None
    }
}

/// Host build: drive the simulated pins through a short scripted run so
/// the whole stack can be watched without hardware.
#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use boardguard::app::ports::Level;
    use boardguard::control::ControlRequest;

    env_logger::init();
    info!("BoardGuard v{} (host simulation)", env!("CARGO_PKG_VERSION"));

    let mut storage = NvsConfigStore::new().map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut config = load_or_default(&mut storage);
    config.poll_interval_ms = 100;
    config.lockup_timeout_ms = 1_000;

    let mut wifi = WifiService::new();
    bring_up_network(&mut wifi, &config);

    let mut gpio = GpioAdapter::new();
    let mut log = RingLog::new();
    let clock = BoardClock::new();
    let engine = WatchdogEngine::new(&config, clock.uptime_ms(), &mut gpio, &mut log);
    let mut shared = Shared {
        ctx: ControlContext::new(engine, config, storage),
        gpio,
        log,
        clock,
    };

    let mut reset_btn = ButtonDriver::new(u64::from(pins::FACTORY_RESET_HOLD_MS));
    let mut flash_btn = ButtonDriver::new(u64::from(pins::FACTORY_RESET_HOLD_MS));

    // Healthy heartbeat for ~2s, then let it go stale to show recovery.
    for pass in 0u32..100 {
        if pass < 40 && pass % 2 == 0 {
            shared.gpio.sim.heartbeat = match shared.gpio.sim.heartbeat {
                Level::Low => Level::High,
                Level::High => Level::Low,
            };
        }
        if run_loop_pass(&mut shared, &mut reset_btn, &mut flash_btn) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(u64::from(LOOP_SLEEP_MS)));
    }

    let now = shared.clock.uptime_ms();
    let Shared { ctx, gpio, log, .. } = &mut shared;
    let status = ctx.dispatch(&ControlRequest::Status, now, gpio, log);
    info!("Final status: {}", status.body);
    Ok(())
}
