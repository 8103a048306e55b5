use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::services::ApiPaths;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Record-storage / group-membership API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_contacts_path")]
    pub contacts_path: String,
    #[serde(default = "default_groups_path")]
    pub groups_path: String,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn paths(&self) -> ApiPaths {
        ApiPaths {
            contacts: self.contacts_path.clone(),
            groups: self.groups_path.clone(),
        }
    }
}

fn default_timeout_secs() -> u64 { 30 }
fn default_contacts_path() -> String { "contacts".to_string() }
fn default_groups_path() -> String { "groups".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ImportSettings {
    /// How many skip/failure reasons a summary quotes
    #[serde(default = "default_summary_reason_limit")]
    pub summary_reason_limit: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            summary_reason_limit: default_summary_reason_limit(),
        }
    }
}

fn default_summary_reason_limit() -> usize { crate::core::DEFAULT_REASON_LIMIT }

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_session_ttl_secs() -> u64 { 1800 }
fn default_max_sessions() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CONTACT_SYNC)
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));
        Self::finish(builder)
    }

    /// Load configuration from one file, then apply the environment on top
    ///
    /// Used when `CONTACT_SYNC_CONFIG` points at a deployment-specific file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let settings = builder
            // e.g., CONTACT_SYNC__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CONTACT_SYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Plain `API_BASE_URL` / `API_KEY` variables win over everything else
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(base_url) = env::var("API_BASE_URL") {
        builder = builder.set_override("api.base_url", base_url)?;
    }
    if let Ok(api_key) = env::var("API_KEY") {
        builder = builder.set_override("api.api_key", api_key)?;
    }

    builder.build()
}
