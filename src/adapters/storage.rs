//! NVS-backed configuration store.
//!
//! Implements [`ConfigPort`] over raw ESP-IDF NVS blob calls. The
//! document is the JSON produced by [`BoardConfig::to_json_bumped`],
//! stored under a single key so a save is one atomic `nvs_commit`.
//! On non-espidf targets the blob lives in memory, which is enough for
//! the host tests and the simulated main loop.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{self, BoardConfig};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "boardguard";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"boardcfg\0";
#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
}

impl NvsConfigStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after an IDF version bump the partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run on the main
            // task before any other NVS user exists.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
            Ok(Self {})
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsConfigStore: in-memory backend");
            Ok(Self { blob: None })
        }
    }

    /// Open an NVS namespace, run a closure with the handle, close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = CONFIG_NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob() -> Result<Vec<u8>, i32> {
        Self::with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                return Err(ret);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        })
    }

    fn parse(bytes: &[u8]) -> Result<BoardConfig, ConfigError> {
        let text = core::str::from_utf8(bytes).map_err(|_| ConfigError::Corrupted)?;
        BoardConfig::from_json(text).map_err(|_| ConfigError::Corrupted)
    }
}

impl ConfigPort for NvsConfigStore {
    fn load(&mut self) -> Result<BoardConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match &self.blob {
                Some(bytes) => Self::parse(bytes),
                None => Err(ConfigError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::read_blob() {
                Ok(bytes) => {
                    let cfg = Self::parse(&bytes)?;
                    info!(
                        "NvsConfigStore: loaded config v{} ({} bytes)",
                        cfg.config_version,
                        bytes.len()
                    );
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound),
                Err(e) => {
                    warn!("NvsConfigStore: NVS read error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&mut self, cfg: &BoardConfig) -> Result<(), ConfigError> {
        config::validate(cfg).map_err(ConfigError::ValidationFailed)?;
        let text = cfg.to_json_bumped().map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.blob = Some(text.into_bytes());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = text.as_bytes();
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsConfigStore: config saved ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsConfigStore: NVS write error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn erase(&mut self) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.blob = None;
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, CONFIG_KEY.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsConfigStore: stored config erased");
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsConfigStore: NVS erase error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
