//! Configuration management
//!
//! Configuration is stored in TOML format at ~/.cyberguard/config.toml and is
//! created with defaults on first run. Secrets are never written to the file:
//! the OpenRouter API key comes from `OPENROUTER_API_KEY` and the admin
//! password may be overridden with `CYBERGUARD_ADMIN_PASS`.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory (SQLite database location)
//! - **server**: Bind address and port for the HTTP API
//! - **llm**: Default model, relay webhook, OpenRouter fallback settings
//! - **admin**: Operator credentials and token TTL

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Admin gate configuration
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier used when the caller supplies none (or an unknown one)
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Primary delegation relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Direct OpenRouter fallback settings
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// Primary delegation endpoint (a generic HTTP relay, e.g. an n8n webhook)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Webhook URL the chat turn is POSTed to
    #[serde(default = "default_relay_url")]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Base URL for the OpenRouter API
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,

    /// HTTP-Referer header value sent with completion requests
    #[serde(default = "default_referer")]
    pub referer: String,

    /// X-Title header value sent with completion requests
    #[serde(default = "default_app_title")]
    pub app_title: String,
    // Note: API key comes from the OPENROUTER_API_KEY env var, not the config file
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Operator username
    #[serde(default = "default_admin_user")]
    pub username: String,

    /// Operator password (override with CYBERGUARD_ADMIN_PASS)
    #[serde(default = "default_admin_pass")]
    pub password: String,

    /// Token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cyberguard")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_relay_url() -> String {
    "http://localhost:5678/webhook/cyber-chat".to_string()
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_app_title() -> String {
    "CyberGuard Chatbot".to_string()
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_admin_pass() -> String {
    "cyber_admin_2026".to_string()
}

fn default_token_ttl_hours() -> u64 {
    8
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            request_timeout_secs: default_request_timeout(),
            relay: RelayConfig::default(),
            openrouter: OpenRouterConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_relay_url(),
        }
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_openrouter_base_url(),
            referer: default_referer(),
            app_title: default_app_title(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_user(),
            password: default_admin_pass(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl Config {
    /// Default configuration file location (~/.cyberguard/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".cyberguard").join("config.toml"))
    }

    /// Load the configuration from the default location, creating it with
    /// defaults on first run.
    pub fn load_or_create() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            let config = Config::default();
            config.save(&path)?;
            tracing::info!("Created default configuration at {}", path.display());
            Ok(config)
        }
    }

    /// Load the configuration from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Write the configuration to disk in TOML format
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Path of the SQLite database file inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("cyberguard.db")
    }

    /// Secrets come from the environment, never from the TOML file
    fn apply_env_overrides(&mut self) {
        if let Ok(pass) = std::env::var("CYBERGUARD_ADMIN_PASS") {
            if !pass.is_empty() {
                self.admin.password = pass;
            }
        }
        if let Ok(user) = std::env::var("CYBERGUARD_ADMIN_USER") {
            if !user.is_empty() {
                self.admin.username = user;
            }
        }
    }
}
