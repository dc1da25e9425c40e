//! Typed views over the `probe` and `monitor` sections of a YAML config.
//!
//! ```yaml
//! probe:
//!     address: www.taobao.com
//!     max_address_len: 255
//!     echo:
//!         backend: command
//!         program: ping
//!         timeout: 3
//!     fallback:
//!         timeout: 2
//!         require_success_status: false
//!         use_proxy: true
//!         user_agent: netprobe/0.1
//! monitor:
//!     interval: 30
//! ```
//!
//! Every key is optional. Timeouts and intervals are whole seconds, greater
//! than zero and capped at [`MAX_TIMEOUT_SECS`] / [`MAX_INTERVAL_SECS`].
use crate::config::{ConfigError, Configurable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "www.taobao.com";
pub const DEFAULT_MAX_ADDRESS_LEN: usize = 255;
pub const DEFAULT_PING_PROGRAM: &str = "ping";
pub const DEFAULT_ECHO_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 3600;
pub const MAX_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_USER_AGENT: &str =
    concat!("netprobe/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoBackend {
    /// Run the system `ping` utility.
    #[default]
    Command,
    /// Send the echo request from an ICMP socket.
    Socket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoSettings {
    pub backend: EchoBackend,
    pub program: String,
    pub timeout: u64,
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            backend: EchoBackend::default(),
            program: DEFAULT_PING_PROGRAM.to_string(),
            timeout: DEFAULT_ECHO_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    pub timeout: u64,
    pub require_success_status: bool,
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` from the environment.
    pub use_proxy: bool,
    pub user_agent: String,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FALLBACK_TIMEOUT_SECS,
            require_success_status: false,
            use_proxy: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub address: String,
    pub max_address_len: usize,
    pub echo: EchoSettings,
    pub fallback: FallbackSettings,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_address_len: DEFAULT_MAX_ADDRESS_LEN,
            echo: EchoSettings::default(),
            fallback: FallbackSettings::default(),
        }
    }
}

impl ProbeSettings {
    /// Read the `probe` section. A config without one yields the defaults.
    pub fn from_config(config: &impl Configurable) -> Result<Self, ConfigError> {
        let settings: Self = config.get_section("probe")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(invalid("probe.address", "must not be empty"));
        }
        if self.max_address_len == 0 {
            return Err(invalid("probe.max_address_len", "must be positive"));
        }
        check_range("probe.echo.timeout", self.echo.timeout, MAX_TIMEOUT_SECS)?;
        if self.echo.program.trim().is_empty() {
            return Err(invalid("probe.echo.program", "must not be empty"));
        }
        check_range(
            "probe.fallback.timeout",
            self.fallback.timeout,
            MAX_TIMEOUT_SECS,
        )?;
        Ok(())
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_secs(self.echo.timeout)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL_SECS,
        }
    }
}

impl MonitorSettings {
    /// Read the `monitor` section. A config without one yields the defaults.
    pub fn from_config(config: &impl Configurable) -> Result<Self, ConfigError> {
        let settings: Self = config.get_section("monitor")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("monitor.interval", self.interval, MAX_INTERVAL_SECS)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

fn check_range(key: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(key, "must be positive"));
    }
    if value > max {
        return Err(invalid(key, &format!("must be at most {max}")));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
