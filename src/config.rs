//! Configuration system for feedview.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - backend on `localhost:8000`, viewer 1, default weights
//! 2. **User config file** - `~/.config/feedview/config.toml`
//! 3. **Environment variables** - `FEEDVIEW_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! viewer_id = 1
//!
//! [feed]
//! recency_popularity = 0.6
//! friends_global = 0.5
//! niche_viral = 0.5
//! topic_tech = 0.6
//! topic_politics = 0.3
//! topic_culture = 0.4
//! notification_limit = 6
//!
//! [output]
//! format = "text"
//! colors = true
//! ```

use crate::backend::DEFAULT_API_URL;
use crate::error::{FeedError, Result, ResultExt, VALID_CONFIG_KEYS};
use crate::model::UserId;
use crate::preferences::{PreferenceKey, Preferences, clamp_weight};
use crate::session::DEFAULT_NOTIFICATION_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Viewer used when nothing else is configured.
pub const DEFAULT_VIEWER_ID: UserId = 1;

/// Main configuration structure for feedview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend location and identity.
    pub api: ApiConfig,
    /// Initial ranking weights and view limits.
    pub feed: FeedConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the ranking backend.
    /// Environment variable: `FEEDVIEW_API_URL`
    pub base_url: String,

    /// User the client acts as.
    /// Environment variable: `FEEDVIEW_VIEWER_ID`
    pub viewer_id: UserId,
}

/// Feed defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Starting weights. Out-of-range values are clamped on use.
    #[serde(flatten)]
    pub preferences: Preferences,

    /// Notifications kept after each refresh.
    /// Environment variable: `FEEDVIEW_NOTIFICATION_LIMIT`
    pub notification_limit: usize,
}

/// Output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty.
    /// Environment variable: `FEEDVIEW_FORMAT`
    pub format: String,

    /// Enable colored output. Disabled by `NO_COLOR` or `FEEDVIEW_NO_COLOR`.
    pub colors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            viewer_id: DEFAULT_VIEWER_ID,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            preferences: Preferences::default(),
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/feedview/config.toml)
    /// 3. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::EnvVarError`] when a `FEEDVIEW_*` variable is set
    /// to a value that does not parse.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        config.apply_env_overrides(|name| std::env::var(name).ok())?;

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("feedview").join("config.toml"))
    }

    /// Apply `FEEDVIEW_*` overrides, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::EnvVarError`] for the first numeric variable that
    /// does not parse. Overrides read before it stay applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FEEDVIEW_API_URL") {
            self.api.base_url = url;
        }
        if let Some(viewer) = lookup("FEEDVIEW_VIEWER_ID") {
            self.api.viewer_id = viewer.trim().parse().map_err(|e| {
                FeedError::env_var("FEEDVIEW_VIEWER_ID", format!("'{viewer}': {e}"))
            })?;
        }
        if let Some(limit) = lookup("FEEDVIEW_NOTIFICATION_LIMIT") {
            self.feed.notification_limit = limit.trim().parse().map_err(|e| {
                FeedError::env_var("FEEDVIEW_NOTIFICATION_LIMIT", format!("'{limit}': {e}"))
            })?;
        }
        if let Some(format) = lookup("FEEDVIEW_FORMAT") {
            self.output.format = format;
        }
        if lookup("FEEDVIEW_NO_COLOR").is_some() || lookup("NO_COLOR").is_some() {
            self.output.colors = false;
        }
        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if !other.api.base_url.trim().is_empty() {
            self.api.base_url = other.api.base_url;
        }
        self.api.viewer_id = other.api.viewer_id;

        self.feed.preferences = other.feed.preferences;
        self.feed.notification_limit = other.feed.notification_limit;

        self.output.format = other.output.format;
        self.output.colors = other.output.colors;
    }

    /// Starting weights, clamped into `[0, 1]`.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.feed.preferences.sanitized()
    }

    /// Set one dotted key (see [`VALID_CONFIG_KEYS`]) from its string form.
    ///
    /// Preference values are clamped like slider input.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::ConfigError`] for an unknown key or a value that
    /// does not parse for that key.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |reason: String| FeedError::config(key, reason);
        let value = value.trim();

        match key {
            "api.base_url" => {
                if value.is_empty() {
                    return Err(invalid("base URL cannot be empty".to_string()));
                }
                self.api.base_url = value.to_string();
            }
            "api.viewer_id" => {
                self.api.viewer_id = value
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not a user id")))?;
            }
            "feed.notification_limit" => {
                self.feed.notification_limit = value
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not a count")))?;
            }
            "output.format" => match value {
                "text" | "json" | "json-pretty" => self.output.format = value.to_string(),
                _ => return Err(invalid(format!("'{value}' is not text, json or json-pretty"))),
            },
            "output.colors" => {
                self.output.colors = value
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not true or false")))?;
            }
            _ => {
                let Some(name) = key.strip_prefix("feed.") else {
                    return Err(invalid(format!(
                        "unknown key; expected one of {}",
                        VALID_CONFIG_KEYS.join(", ")
                    )));
                };
                let pref: PreferenceKey = name.parse().map_err(|_| {
                    invalid(format!(
                        "unknown key; expected one of {}",
                        VALID_CONFIG_KEYS.join(", ")
                    ))
                })?;
                let weight = value
                    .parse::<f64>()
                    .ok()
                    .and_then(clamp_weight)
                    .ok_or_else(|| invalid(format!("'{value}' is not a number")))?;
                self.feed.preferences.set(pref, weight);
            }
        }
        Ok(())
    }

    /// Save the current configuration to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the parent directory cannot be created, or the file cannot be written.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
            .context("Could not determine config directory")?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Serializing config")?;

        std::fs::write(path, content).with_context(|| format!("Writing {}", path.display()))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }
}
