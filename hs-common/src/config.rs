//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Individual settings are
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the service starts on compiled
//! defaults and logs a warning. A config file that exists but does not parse
//! or fails validation is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HANDLESCOPE_CONFIG";

/// Environment variable overriding the outgoing User-Agent header
pub const USER_AGENT_ENV_VAR: &str = "HANDLESCOPE_USER_AGENT";

/// Browser-like User-Agent sent with every outgoing request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; absent keys take compiled defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Lookup budgets and backend selection
    #[serde(default)]
    pub lookup: LookupConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            lookup: LookupConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Time budgets and backend selection for a single lookup
///
/// All durations are in milliseconds in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Overall budget for one lookup when the caller does not pass one
    pub budget_ms: u64,
    /// Per-call timeout for the primary profile host
    pub primary_timeout_ms: u64,
    /// Per-call timeout for the microblog syndication endpoint
    pub syndication_timeout_ms: u64,
    /// Per-target timeout inside a mirror race
    pub mirror_timeout_ms: u64,
    /// Upper bound for the personal website fetch
    pub website_timeout_ms: u64,
    /// Minimum budget that must remain before the website is fetched
    pub website_min_remaining_ms: u64,
    /// User-Agent header for outgoing requests
    pub user_agent: String,
    /// Allow-list of microblog mirror names (None = all built-in mirrors)
    pub microblog_mirrors: Option<Vec<String>>,
    /// Allow-list of photo viewer names (None = all built-in viewers)
    pub photo_viewers: Option<Vec<String>>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            budget_ms: 20_000,
            primary_timeout_ms: 10_000,
            syndication_timeout_ms: 3_000,
            mirror_timeout_ms: 6_000,
            website_timeout_ms: 10_000,
            website_min_remaining_ms: 1_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            microblog_mirrors: None,
            photo_viewers: None,
        }
    }
}

impl LookupConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn syndication_timeout(&self) -> Duration {
        Duration::from_millis(self.syndication_timeout_ms)
    }

    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_millis(self.mirror_timeout_ms)
    }

    pub fn website_timeout(&self) -> Duration {
        Duration::from_millis(self.website_timeout_ms)
    }

    pub fn website_min_remaining(&self) -> Duration {
        Duration::from_millis(self.website_min_remaining_ms)
    }

    /// Reject budgets that would make every lookup fail immediately
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("budget_ms", self.budget_ms),
            ("primary_timeout_ms", self.primary_timeout_ms),
            ("syndication_timeout_ms", self.syndication_timeout_ms),
            ("mirror_timeout_ms", self.mirror_timeout_ms),
            ("website_timeout_ms", self.website_timeout_ms),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                return Err(Error::Config(format!("lookup.{} must be greater than 0", key)));
            }
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("lookup.user_agent must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the config file following the resolution priority
///
/// Returns `None` when no candidate exists; the caller falls back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user config, then system config
    let user_config = dirs::config_dir().map(|d| d.join("handlescope").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/handlescope/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Read, parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.lookup.validate()?;
    Ok(config)
}

/// Load configuration with graceful degradation
///
/// A resolved path that does not exist yields compiled defaults. The
/// User-Agent environment override is applied last.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)?
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            TomlConfig::default()
        }
        None => {
            info!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
    };

    if let Ok(agent) = std::env::var(USER_AGENT_ENV_VAR) {
        if !agent.trim().is_empty() {
            config.lookup.user_agent = agent;
        }
    }

    Ok(config)
}
