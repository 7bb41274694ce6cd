//! Reconciler configuration
//!
//! Loaded from a TOML file with `PVE_BOOTSTRAP_*` environment overrides.
//! Nested keys use a double underscore, e.g. `PVE_BOOTSTRAP_NAMING__IPV6_SUFFIX`.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pve_vm_network::DeviceNaming;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "PVE_BOOTSTRAP";

/// Key of the bootstrap secret holding the payload.
pub const DEFAULT_SECRET_VALUE_KEY: &str = "value";

const CONFIG_PATHS: &[&str] = &[
    "/etc/pve/machine-bootstrap.toml",
    "/etc/proxmox/machine-bootstrap.toml",
    "./machine-bootstrap.toml",
];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Device names and address claim suffixes
    pub naming: DeviceNaming,
    /// Secret key the bootstrap payload is stored under
    pub secret_value_key: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            naming: DeviceNaming::default(),
            secret_value_key: DEFAULT_SECRET_VALUE_KEY.to_string(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load(Some(path.as_ref()), environment())
    }

    /// Load configuration from the first existing standard location, or the
    /// defaults, with environment overrides applied
    pub fn load_with_defaults() -> Result<Self, ConfigError> {
        let path = CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|path| path.exists());

        match path {
            Some(path) => log::debug!("loading bootstrap config from {}", path.display()),
            None => log::debug!("no bootstrap config file found, using defaults"),
        }

        Self::load(path, environment())
    }

    fn load(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder.add_source(env).build()?;
        let config: BootstrapConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.naming.validate().map_err(ConfigError::Invalid)?;
        if self.secret_value_key.is_empty() {
            return Err(ConfigError::Invalid(
                "secret_value_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
