//! Configuration management for pirep-bridge.
//!
//! Configuration is loaded with figment from defaults, a TOML file and
//! environment variables. Both the prefixed nested form
//! (`PXP_PHPVMS__API_KEY`) and the flat names used by earlier releases
//! (`PHPVMS_API_KEY`) are accepted.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::logging::Verbosity;
use crate::preferences::Preferences;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory under the platform config dir.
const APP_DIR_NAME: &str = "pirep-bridge";

/// Preference file name.
const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Prefix for nested environment variables.
const ENV_PREFIX: &str = "PXP_";

/// Flat environment names and the keys they set.
const LEGACY_ENV: [(&str, &str); 8] = [
    ("PHPVMS_BASE_URL", "phpvms.base_url"),
    ("PHPVMS_API_KEY", "phpvms.api_key"),
    ("UDP_BIND_HOST", "udp.bind_host"),
    ("UDP_BIND_PORT", "udp.bind_port"),
    ("SIMBRIEF_USER_ID", "simbrief.user_id"),
    ("SELECTED_AIRLINE_ID", "selection.airline_id"),
    ("SELECTED_AIRCRAFT_ID", "selection.aircraft_id"),
    ("LOG_LEVEL", "log_level"),
];

/// Accepted `log_level` values.
pub const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `PXP_`, nested with `__`
/// 2. Flat environment names such as `PHPVMS_API_KEY`
/// 3. TOML config file at `~/.config/pirep-bridge/config.toml`
/// 4. Default values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// One of `debug`, `info`, `warn`, `error`.
    pub log_level: String,
    /// Virtual airline site.
    pub phpvms: PhpvmsConfig,
    /// Telemetry socket.
    pub udp: UdpConfig,
    /// SimBrief flight plans.
    pub simbrief: SimBriefConfig,
    /// Pre-selected airline and aircraft.
    pub selection: SelectionConfig,
}

/// Virtual airline site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpvmsConfig {
    /// Site root, e.g. `https://va.example`.
    pub base_url: String,
    /// Pilot API key.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Telemetry socket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    /// Host or address to bind.
    pub bind_host: String,
    /// Port to bind.
    pub bind_port: u16,
    /// Receive timeout between cancellation checks, milliseconds.
    pub read_timeout_ms: u64,
    /// Receive buffer size.
    pub max_datagram_bytes: usize,
}

/// SimBrief configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimBriefConfig {
    /// SimBrief pilot ID.
    #[serde(deserialize_with = "id_string")]
    pub user_id: Option<String>,
    /// OFP fetch endpoint.
    pub fetch_url: String,
}

/// Airline and aircraft chosen for the next prefile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Airline ID.
    pub airline_id: Option<u32>,
    /// Aircraft ID.
    pub aircraft_id: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            phpvms: PhpvmsConfig::default(),
            udp: UdpConfig::default(),
            simbrief: SimBriefConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl Default for PhpvmsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 47777,
            read_timeout_ms: 1000,
            max_datagram_bytes: 64 * 1024,
        }
    }
}

impl Default for SimBriefConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            fetch_url: "https://www.simbrief.com/api/xml.fetcher.php".to_string(),
        }
    }
}

/// Numeric IDs set through the environment arrive as numbers.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| Uncased::from(*path))
    })
}

impl Config {
    /// Load and validate configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load and validate configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::extract_from(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or parsing fails.
    pub fn extract_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(legacy_env())
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::app_dir().join(CONFIG_FILE_NAME)
    }

    /// Get the default preferences file path.
    #[must_use]
    pub fn default_preferences_path() -> PathBuf {
        Self::app_dir().join(PREFERENCES_FILE_NAME)
    }

    fn app_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::ConfigValidation {
                message: message.to_string(),
            })
        };

        let base_url = self.phpvms.base_url.trim();
        if base_url.is_empty() {
            return invalid("phpvms.base_url is required (PHPVMS_BASE_URL)");
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::ConfigValidation {
                message: format!("phpvms.base_url must be an http(s) URL: {base_url}"),
            });
        }
        if self.phpvms.api_key.trim().is_empty() {
            return invalid("phpvms.api_key is required (PHPVMS_API_KEY)");
        }
        if self.phpvms.timeout_secs == 0 {
            return invalid("phpvms.timeout_secs must be greater than 0");
        }

        if self.udp.bind_host.trim().is_empty() {
            return invalid("udp.bind_host must not be empty");
        }
        if self.udp.bind_port == 0 {
            return invalid("udp.bind_port must be between 1 and 65535");
        }
        if self.udp.read_timeout_ms == 0 {
            return invalid("udp.read_timeout_ms must be greater than 0");
        }
        if self.udp.max_datagram_bytes == 0 {
            return invalid("udp.max_datagram_bytes must be greater than 0");
        }

        if self.verbosity().is_none() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "log_level must be one of {}: {:?}",
                    LOG_LEVELS.join(", "),
                    self.log_level
                ),
            });
        }

        Ok(())
    }

    /// Overlay persisted selections onto the configured ones.
    pub fn apply_preferences(&mut self, preferences: &Preferences) {
        if preferences.airline_id.is_some() {
            self.selection.airline_id = preferences.airline_id;
        }
        if preferences.aircraft_id.is_some() {
            self.selection.aircraft_id = preferences.aircraft_id;
        }
    }

    /// The verbosity named by `log_level`, if recognised.
    #[must_use]
    pub fn verbosity(&self) -> Option<Verbosity> {
        Verbosity::from_log_level(&self.log_level)
    }

    /// The listener bind address as `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        let host = self.udp.bind_host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.udp.bind_port)
        } else {
            format!("{host}:{}", self.udp.bind_port)
        }
    }

    /// Get the HTTP timeout as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.phpvms.timeout_secs)
    }

    /// Get the listener read timeout as a Duration.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.udp.read_timeout_ms)
    }

    /// The SimBrief user, if one is configured.
    #[must_use]
    pub fn simbrief_user(&self) -> Option<&str> {
        self.simbrief
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// A copy safe to print, with the API key masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.phpvms.api_key.is_empty() {
            config.phpvms.api_key = "********".to_string();
        }
        config
    }
}
