use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Directory under the home directory holding config and the cached spec.
pub const CONFIG_DIR_NAME: &str = ".cobo";

/// Default config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Target deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    pub fn default_host(self) -> &'static str {
        match self {
            Self::Dev => "https://api.dev.cobo.com",
            Self::Prod => "https://api.cobo.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            _ => Err(ConfigError::InvalidValue {
                key: "environment".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Settings loaded from `~/.cobo/config.yaml`.
///
/// `auth_method` stays a raw string here; it is interpreted when credentials
/// are built so an unknown method surfaces as an authentication error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub environment: Environment,
    pub auth_method: Option<String>,
    pub api_host: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub user_access_token: Option<String>,
    pub org_access_token: Option<String>,
    /// Developer portal base URL.
    pub base_url: Option<String>,
    /// Remote location of the OpenAPI document.
    pub spec_url: Option<String>,
}

impl CliConfig {
    /// Look a setting up by its config-file key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "environment" => Some(self.environment.as_str()),
            "auth_method" => self.auth_method.as_deref(),
            "api_host" => Some(self.api_host()),
            "api_key" => self.api_key.as_deref(),
            "api_secret" => self.api_secret.as_deref(),
            "user_access_token" => self.user_access_token.as_deref(),
            "org_access_token" => self.org_access_token.as_deref(),
            "base_url" => self.base_url.as_deref(),
            "spec_url" => self.spec_url.as_deref(),
            _ => None,
        }
    }

    /// Configured host, else the environment's default.
    pub fn api_host(&self) -> &str {
        self.api_host
            .as_deref()
            .unwrap_or_else(|| self.environment.default_host())
    }
}

/// `~/.cobo`, or `None` when no home directory is known.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

/// `~/.cobo/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<CliConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Some(CliConfig::default()));
    }
    let parse_error = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let raw: serde_yaml_ng::Value = serde_yaml_ng::from_str(&content).map_err(parse_error)?;
    if let Some(env) = raw.get("environment").and_then(serde_yaml_ng::Value::as_str) {
        env.parse::<Environment>()?;
    }
    let config: CliConfig = serde_yaml_ng::from_value(raw).map_err(parse_error)?;
    Ok(Some(config))
}
