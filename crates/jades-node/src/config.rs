//! Service configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full configuration for the JAdES service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JadesConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Signing material settings.
    #[serde(default)]
    pub signer: SignerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Path to the PEM certificate chain (leaf first).
    #[serde(default = "default_chain_path")]
    pub certificate_chain: PathBuf,
    /// Path to the PKCS#8 private key PEM.
    #[serde(default = "default_key_path")]
    pub private_key: PathBuf,
    /// Default JWS algorithm for signing requests.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Key identifier; derived from the leaf certificate when unset.
    #[serde(default)]
    pub kid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9400
}
fn default_chain_path() -> PathBuf {
    PathBuf::from("./certificate.crt")
}
fn default_key_path() -> PathBuf {
    PathBuf::from("./private.pem")
}
fn default_algorithm() -> String {
    "RS256".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            certificate_chain: default_chain_path(),
            private_key: default_key_path(),
            algorithm: default_algorithm(),
            kid: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl JadesConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: JadesConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
