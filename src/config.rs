//! Configuration management for vsphere-exporter
//!
//! Handles loading and validating configuration from YAML files, resolving
//! scrape targets to credentials, and all-or-nothing reloads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::error::{AppError, CredentialError};

/// Name of the fallback credentials entry
pub const DEFAULT_CLUSTER: &str = "default";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Scrape mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    /// Always scrape `enabled_cluster`; the `target` parameter is ignored
    Single,
    /// Scrape whatever the `target` parameter names
    #[default]
    Multi,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scrape mode
    #[serde(default)]
    pub mode: ScrapeMode,

    /// Target scraped in single mode
    #[serde(default)]
    pub enabled_cluster: Option<String>,

    /// Credentials per target, with an optional `default` entry
    #[serde(default)]
    pub clusters: HashMap<String, Credentials>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// vSphere API configuration
    #[serde(default)]
    pub vsphere: VsphereConfig,
}

/// Login credentials for one vCenter / ESXi endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Scrape endpoint path
    #[serde(default = "default_scrape_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// vSphere API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsphereConfig {
    /// Per-request HTTP timeout and per-pass collection deadline, in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// VI/JSON API release segment
    #[serde(default = "default_api_release")]
    pub api_release: String,

    /// Skip TLS certificate verification
    #[serde(default = "default_insecure")]
    pub insecure: bool,
}

// Default value functions
fn default_port() -> u16 {
    9272
}

fn default_scrape_path() -> String {
    "/vsphere".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout() -> u64 {
    30_000
}

fn default_api_release() -> String {
    "8.0.1.0".to_string()
}

fn default_insecure() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_scrape_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            api_release: default_api_release(),
            insecure: default_insecure(),
        }
    }
}

/// Paths the scrape endpoint may not take
const RESERVED_PATHS: &[&str] = &["/", "/health", "/metrics"];

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Scrape path must start with '/'".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.server.path.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Scrape path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        if self.vsphere.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "vsphere.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.mode == ScrapeMode::Single
            && self
                .enabled_cluster
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "enabled_cluster is required in single mode".to_string(),
            ));
        }

        for (name, credentials) in &self.clusters {
            if credentials.username.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "cluster '{}' has an empty username",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Decide which endpoint a scrape request targets
    ///
    /// Single mode ignores the request parameter; multi mode requires it.
    pub fn resolve_target(&self, requested: Option<&str>) -> Result<String, AppError> {
        match self.mode {
            ScrapeMode::Single => self
                .enabled_cluster
                .clone()
                .ok_or_else(|| AppError::Internal("enabled_cluster is not set".to_string())),
            ScrapeMode::Multi => requested
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or(AppError::MissingTarget),
        }
    }

    /// Credentials for a target, falling back to the `default` entry
    pub fn credentials_for(&self, target: &str) -> Result<Credentials, CredentialError> {
        self.clusters
            .get(target)
            .or_else(|| self.clusters.get(DEFAULT_CLUSTER))
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                target: target.to_string(),
            })
    }
}

/// Live configuration shared by request handlers
///
/// Readers take a cheap snapshot; a reload swaps the whole value only after
/// the new file parsed and validated.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    path: PathBuf,
    current: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration
    pub fn snapshot(&self) -> Arc<Config> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Path the configuration is reloaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the configuration file
    ///
    /// On any error the previous configuration stays active.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let config = Config::load(&self.path)?;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MULTI_CONFIG: &str = r#"
mode: multi
clusters:
  default:
    username: monitor@vsphere.local
    password: default-secret
  vc01.example.com:
    username: admin@vsphere.local
    password: vc01-secret
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mode, ScrapeMode::Multi);
        assert_eq!(config.server.port, 9272);
        assert_eq!(config.server.path, "/vsphere");
        assert_eq!(config.vsphere.timeout_ms, 30_000);
        assert!(config.vsphere.insecure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.path = "/metrics".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.vsphere.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_mode_requires_enabled_cluster() {
        let result = Config::from_yaml("mode: single\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let config = Config::from_yaml("mode: single\nenabled_cluster: vc01\n").unwrap();
        assert_eq!(config.resolve_target(Some("ignored")).unwrap(), "vc01");
        assert_eq!(config.resolve_target(None).unwrap(), "vc01");
    }

    #[test]
    fn test_multi_mode_requires_target() {
        let config = Config::from_yaml(MULTI_CONFIG).unwrap();
        assert!(matches!(
            config.resolve_target(None),
            Err(AppError::MissingTarget)
        ));
        assert!(matches!(
            config.resolve_target(Some("  ")),
            Err(AppError::MissingTarget)
        ));
        assert_eq!(
            config.resolve_target(Some("vc02")).unwrap(),
            "vc02".to_string()
        );
    }

    #[test]
    fn test_credentials_fallback_to_default() {
        let config = Config::from_yaml(MULTI_CONFIG).unwrap();

        let exact = config.credentials_for("vc01.example.com").unwrap();
        assert_eq!(exact.username, "admin@vsphere.local");

        let fallback = config.credentials_for("vc99.example.com").unwrap();
        assert_eq!(fallback.username, "monitor@vsphere.local");
    }

    #[test]
    fn test_credentials_missing() {
        let config = Config::from_yaml(
            "clusters:\n  vc01:\n    username: a\n    password: b\n",
        )
        .unwrap();
        assert!(matches!(
            config.credentials_for("vc02"),
            Err(CredentialError::NotFound { .. })
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_reload_keeps_previous_config_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MULTI_CONFIG.as_bytes()).unwrap();
        file.flush().unwrap();

        let shared = SharedConfig::new(file.path(), Config::load(file.path()).unwrap());
        assert_eq!(shared.snapshot().clusters.len(), 2);

        std::fs::write(file.path(), "clusters: [not valid").unwrap();
        assert!(shared.reload().is_err());
        assert_eq!(shared.snapshot().clusters.len(), 2);

        std::fs::write(
            file.path(),
            "clusters:\n  default:\n    username: only\n    password: one\n",
        )
        .unwrap();
        shared.reload().unwrap();
        assert_eq!(shared.snapshot().clusters.len(), 1);
    }
}
