//! Board configuration parameters.
//!
//! All tunable parameters for the BoardGuard watchdog.  Values are
//! persisted as a JSON document keyed by the fixed `"BoardConfig"`
//! section name and can be replaced at runtime through the control
//! surface.  Missing keys fall back to firmware defaults so a config
//! written by an older firmware still loads.

use serde::{Deserialize, Serialize};

/// Fixed section name the persisted JSON document is keyed by.
pub const CONFIG_SECTION: &str = "BoardConfig";

pub const DEFAULT_CHIP_ID: u32 = 1;
pub const DEFAULT_SERVER_PORT: u16 = 80;
pub const DEFAULT_HOTSPOT_SSID: &str = "boardguard";
pub const DEFAULT_HOTSPOT_PASSWORD: &str = "boardguard";
/// Max time the heartbeat may stay unchanged before it counts as a hang.
pub const DEFAULT_LOCKUP_TIMEOUT_MS: u64 = 10_000;
/// Minimum spacing between two recovery actions.
pub const DEFAULT_COOLDOWN_MS: u64 = 120_000;
/// Heartbeat toggles needed before the cooldown window is collapsed.
pub const DEFAULT_DEBOUNCE_COUNT: u32 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 1_000;

/// Core board configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    // --- Identity ---
    /// Installation identifier (several guards can share one network).
    pub chip_id: u32,
    /// Bumped by one on every save; never edited by hand.
    pub config_version: u32,

    // --- Network ---
    /// Control-surface HTTP port.
    pub server_port: u16,
    /// Fallback access-point SSID when station mode fails.
    pub hotspot_ssid: String,
    pub hotspot_password: String,
    /// Station-mode credentials for the site network.
    pub wifi_ssid: String,
    pub wifi_password: String,

    // --- Watchdog thresholds ---
    /// Time the supervised board may hold the heartbeat level (ms).
    pub lockup_timeout_ms: u64,
    /// Quiet period after a recovery action (ms).
    pub cooldown_ms: u64,
    /// Heartbeat toggles that prove the board alive again.
    pub debounce_count: u32,
    /// Master switch; when false the engine observes but never pulses.
    pub enabled: bool,
    /// Engine evaluation spacing (ms).
    pub poll_interval_ms: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            chip_id: DEFAULT_CHIP_ID,
            config_version: 0,
            server_port: DEFAULT_SERVER_PORT,
            hotspot_ssid: DEFAULT_HOTSPOT_SSID.to_owned(),
            hotspot_password: DEFAULT_HOTSPOT_PASSWORD.to_owned(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            lockup_timeout_ms: DEFAULT_LOCKUP_TIMEOUT_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            debounce_count: DEFAULT_DEBOUNCE_COUNT,
            enabled: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Reject configs that would wedge the watchdog if adopted.
pub fn validate(config: &BoardConfig) -> Result<(), &'static str> {
    if config.poll_interval_ms == 0 {
        return Err("poll_interval_ms must be non-zero");
    }
    if config.lockup_timeout_ms < u64::from(config.poll_interval_ms) {
        return Err("lockup_timeout_ms shorter than the poll interval");
    }
    if config.server_port == 0 {
        return Err("server_port must be non-zero");
    }
    Ok(())
}

/// Wrapper matching the persisted document shape:
/// `{"BoardConfig": { ... }}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(rename = "BoardConfig", default)]
    board: BoardConfig,
}

impl BoardConfig {
    /// Parse a persisted document.  Unknown keys are ignored and missing
    /// keys take defaults, so partial or stale documents still load.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let doc: ConfigDocument = serde_json::from_str(text)?;
        Ok(doc.board)
    }

    /// Serialize into the persisted document shape with the version
    /// counter bumped by one.  The in-memory copy is left untouched; the
    /// bumped value is observed on the next load.
    pub fn to_json_bumped(&self) -> Result<String, serde_json::Error> {
        let mut copy = self.clone();
        copy.config_version += 1;
        serde_json::to_string(&ConfigDocument { board: copy })
    }

    /// Merge a JSON update document into this config.  Only keys present
    /// under the `"BoardConfig"` section are applied; everything else is
    /// left as-is.  Identity and version fields cannot be overwritten.
    pub fn apply_update(&mut self, text: &str) -> Result<(), serde_json::Error> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        let Some(section) = doc.get(CONFIG_SECTION).and_then(|v| v.as_object()) else {
            return Ok(());
        };

        if let Some(v) = section.get("server_port").and_then(serde_json::Value::as_u64) {
            self.server_port = v as u16;
        }
        if let Some(v) = section.get("hotspot_ssid").and_then(serde_json::Value::as_str) {
            self.hotspot_ssid = v.to_owned();
        }
        if let Some(v) = section.get("hotspot_password").and_then(serde_json::Value::as_str) {
            self.hotspot_password = v.to_owned();
        }
        if let Some(v) = section.get("wifi_ssid").and_then(serde_json::Value::as_str) {
            self.wifi_ssid = v.to_owned();
        }
        if let Some(v) = section.get("wifi_password").and_then(serde_json::Value::as_str) {
            self.wifi_password = v.to_owned();
        }
        if let Some(v) = section.get("lockup_timeout_ms").and_then(serde_json::Value::as_u64) {
            self.lockup_timeout_ms = v;
        }
        if let Some(v) = section.get("cooldown_ms").and_then(serde_json::Value::as_u64) {
            self.cooldown_ms = v;
        }
        if let Some(v) = section.get("debounce_count").and_then(serde_json::Value::as_u64) {
            self.debounce_count = v as u32;
        }
        if let Some(v) = section.get("enabled").and_then(serde_json::Value::as_bool) {
            self.enabled = v;
        }
        if let Some(v) = section.get("poll_interval_ms").and_then(serde_json::Value::as_u64) {
            self.poll_interval_ms = v as u32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = BoardConfig::default();
        assert!(c.lockup_timeout_ms > 0);
        assert!(c.cooldown_ms > c.lockup_timeout_ms);
        assert!(c.poll_interval_ms > 0);
        assert!(c.enabled);
        assert_eq!(c.config_version, 0);
    }

    #[test]
    fn json_roundtrip_preserves_thresholds() {
        let mut c = BoardConfig::default();
        c.lockup_timeout_ms = 15_000;
        c.debounce_count = 4;
        let json = c.to_json_bumped().unwrap();
        let c2 = BoardConfig::from_json(&json).unwrap();
        assert_eq!(c2.lockup_timeout_ms, 15_000);
        assert_eq!(c2.debounce_count, 4);
    }

    #[test]
    fn save_bumps_version_by_one() {
        let c = BoardConfig::default();
        let json = c.to_json_bumped().unwrap();
        let c2 = BoardConfig::from_json(&json).unwrap();
        assert_eq!(c2.config_version, c.config_version + 1);
        // The in-memory copy is untouched.
        assert_eq!(c.config_version, 0);
    }

    #[test]
    fn partial_document_takes_defaults() {
        let c = BoardConfig::from_json(r#"{"BoardConfig":{"lockup_timeout_ms":5000}}"#).unwrap();
        assert_eq!(c.lockup_timeout_ms, 5_000);
        assert_eq!(c.cooldown_ms, DEFAULT_COOLDOWN_MS);
        assert_eq!(c.debounce_count, DEFAULT_DEBOUNCE_COUNT);
        assert!(c.enabled);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let c = BoardConfig::from_json("{}").unwrap();
        assert_eq!(c, BoardConfig::default());
    }

    #[test]
    fn apply_update_merges_present_keys_only() {
        let mut c = BoardConfig::default();
        c.wifi_ssid = "site-net".to_owned();
        c.apply_update(r#"{"BoardConfig":{"cooldown_ms":60000,"enabled":false}}"#)
            .unwrap();
        assert_eq!(c.cooldown_ms, 60_000);
        assert!(!c.enabled);
        // Untouched fields survive the merge.
        assert_eq!(c.wifi_ssid, "site-net");
        assert_eq!(c.lockup_timeout_ms, DEFAULT_LOCKUP_TIMEOUT_MS);
    }

    #[test]
    fn apply_update_cannot_touch_version() {
        let mut c = BoardConfig::default();
        c.apply_update(r#"{"BoardConfig":{"config_version":99,"chip_id":7}}"#)
            .unwrap();
        assert_eq!(c.config_version, 0);
        assert_eq!(c.chip_id, DEFAULT_CHIP_ID);
    }

    #[test]
    fn apply_update_rejects_malformed_json() {
        let mut c = BoardConfig::default();
        assert!(c.apply_update("not json").is_err());
    }

    #[test]
    fn apply_update_without_section_is_a_noop() {
        let mut c = BoardConfig::default();
        c.apply_update(r#"{"Other":{"enabled":false}}"#).unwrap();
        assert!(c.enabled);
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut c = BoardConfig::default();
        c.poll_interval_ms = 0;
        assert!(validate(&c).is_err());
    }

    #[test]
    fn validate_rejects_timeout_below_poll_interval() {
        let mut c = BoardConfig::default();
        c.lockup_timeout_ms = 500;
        assert!(validate(&c).is_err());
        c.lockup_timeout_ms = u64::from(c.poll_interval_ms);
        assert!(validate(&c).is_ok());
    }
}
