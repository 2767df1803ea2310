//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `hpapower.toml` in the working directory. Every field has a
//! default so the file is optional, and with neither file nor environment
//! the daemon listens on port 80, controls `/hpa_power_set`, serves
//! `./htdocs` and drives GPIO 4. Environment variables take precedence over
//! file values.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use hpapower_adapter_gpio_sysfs::SysfsConfig;
use hpapower_app::services::transaction::ControlEndpoint;
use hpapower_domain::form::DEFAULT_MAX_FIELD_LEN;

const CONFIG_FILE: &str = "hpapower.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Control endpoint settings.
    pub control: ControlConfig,
    /// Static file mount.
    pub static_files: StaticFilesConfig,
    /// Actuator driver selection.
    pub actuator: ActuatorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Control endpoint configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Exact request path handled by the control transaction.
    pub path: String,
    /// Longest accepted field value, in decoded bytes.
    pub max_field_len: usize,
}

/// Static file mount configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Document root.
    pub root: PathBuf,
}

/// Which actuator driver to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Kernel sysfs GPIO line.
    #[default]
    Sysfs,
    /// In-memory line, for machines without the hardware.
    Virtual,
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sysfs" => Ok(Self::Sysfs),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown actuator driver `{other}`"
            ))),
        }
    }
}

/// Actuator configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Driver selection.
    pub driver: DriverKind,
    /// Sysfs line settings, ignored by the virtual driver.
    #[serde(flatten)]
    pub gpio: SysfsConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `hpapower.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, if an
    /// override cannot be applied, or if the result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("HPAPOWER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("HPAPOWER_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Some(val) = var("HPAPOWER_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("HPAPOWER_DRIVER") {
            self.actuator.driver = val.parse()?;
        }
        if let Some(val) = var("HPAPOWER_GPIO_PIN") {
            self.actuator.gpio.pin = val.parse().map_err(|_| {
                ConfigError::Validation(format!("invalid GPIO pin `{val}`"))
            })?;
        }
        if let Some(val) = var("HPAPOWER_HTDOCS") {
            self.static_files.root = PathBuf::from(val);
        }
        if let Some(val) = var("HPAPOWER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if !self.control.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "control path must start with `/`".to_string(),
            ));
        }
        if self.control.max_field_len == 0 {
            return Err(ConfigError::Validation(
                "max_field_len must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Control endpoint settings for the transaction.
    #[must_use]
    pub fn endpoint(&self) -> ControlEndpoint {
        ControlEndpoint {
            path: self.control.path.clone(),
            max_field_len: self.control.max_field_len,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            path: "/hpa_power_set".to_string(),
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./htdocs"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hpapowerd=info,hpapower=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
