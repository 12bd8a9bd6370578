//! WiFi bring-up: station mode with a hotspot fallback.
//!
//! The board first tries to join the configured site network as a
//! station, retrying with exponential backoff. When every attempt
//! fails it raises its own access point instead, so the operator can
//! always reach the HTTP control surface and fix the credentials.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver calls via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **other targets**: a simulation backend with a programmable
//!   failure count, used by the host tests to exercise the fallback.

use core::fmt;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};

/// Station attempts before giving up and raising the hotspot.
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

/// What the radio is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    Idle,
    Station,
    AccessPoint,
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub struct WifiService {
    mode: WifiMode,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: this many station attempts fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    pub sim_failures_remaining: u32,
}

#[cfg(target_os = "espidf")]
impl WifiService {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sysloop.clone(), Some(nvs))?,
            sysloop,
        )?;
        Ok(Self {
            mode: WifiMode::Idle,
            wifi,
        })
    }

    fn platform_connect(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|()| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|()| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .start()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: station up, ip={}", ip_info.ip);
        }
        Ok(())
    }

    fn platform_start_ap(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let ap = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|()| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|()| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::AccessPoint(ap))
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .start()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        Ok(())
    }

    fn platform_sleep_secs(secs: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(secs * 1_000);
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: WifiMode::Idle,
            sim_failures_remaining: 0,
        }
    }

    fn platform_connect(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectivityError> {
        if self.sim_failures_remaining > 0 {
            self.sim_failures_remaining -= 1;
            warn!("WiFi(sim): simulated connect failure to '{ssid}'");
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{ssid}'");
        Ok(())
    }

    fn platform_start_ap(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): access point '{ssid}' up");
        Ok(())
    }

    fn platform_sleep_secs(_secs: u32) {}
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiService {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiService {
    #[must_use]
    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    /// Join the site network, retrying with exponential backoff.
    pub fn connect_with_retries(
        &mut self,
        ssid: &str,
        password: &str,
        max_attempts: u32,
    ) -> Result<(), ConnectivityError> {
        if ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        validate_ssid(ssid)?;
        validate_password(password)?;

        let mut backoff_secs = INITIAL_BACKOFF_SECS;
        for attempt in 1..=max_attempts {
            info!("WiFi: station connect to '{ssid}', attempt {attempt}/{max_attempts}");
            match self.platform_connect(ssid, password) {
                Ok(()) => {
                    self.mode = WifiMode::Station;
                    return Ok(());
                }
                Err(err) if attempt < max_attempts => {
                    warn!("WiFi: attempt {attempt} failed ({err}), retrying in {backoff_secs}s");
                    Self::platform_sleep_secs(backoff_secs);
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                }
                Err(err) => {
                    warn!("WiFi: giving up on '{ssid}' after {max_attempts} attempts ({err})");
                    self.mode = WifiMode::Idle;
                    return Err(err);
                }
            }
        }
        Err(ConnectivityError::ConnectionFailed)
    }

    /// Raise the fallback hotspot so the control surface stays reachable.
    pub fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.platform_start_ap(ssid, password)?;
        self.mode = WifiMode::AccessPoint;
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ssid() {
        let mut w = WifiService::new();
        assert_eq!(
            w.connect_with_retries("", "password1", 3),
            Err(ConnectivityError::NoCredentials)
        );
    }

    #[test]
    fn rejects_short_password() {
        let mut w = WifiService::new();
        assert_eq!(
            w.connect_with_retries("MyNet", "short", 3),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn accepts_open_network() {
        let mut w = WifiService::new();
        assert!(w.connect_with_retries("OpenNet", "", 3).is_ok());
        assert_eq!(w.mode(), WifiMode::Station);
    }

    #[test]
    fn retries_until_success() {
        let mut w = WifiService::new();
        w.sim_failures_remaining = 2;
        assert!(w.connect_with_retries("FlakyNet", "password1", 5).is_ok());
        assert_eq!(w.mode(), WifiMode::Station);
        assert_eq!(w.sim_failures_remaining, 0);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut w = WifiService::new();
        w.sim_failures_remaining = 10;
        assert_eq!(
            w.connect_with_retries("DeadNet", "password1", MAX_CONNECT_ATTEMPTS),
            Err(ConnectivityError::ConnectionFailed)
        );
        assert_eq!(w.mode(), WifiMode::Idle);
    }

    #[test]
    fn hotspot_fallback_reaches_access_point_mode() {
        let mut w = WifiService::new();
        w.sim_failures_remaining = 3;
        assert!(w.connect_with_retries("DeadNet", "password1", 3).is_err());
        w.start_access_point("boardguard", "boardguard").unwrap();
        assert_eq!(w.mode(), WifiMode::AccessPoint);
    }
}
