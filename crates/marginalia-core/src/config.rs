//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/marginalia/config.toml)
//! 3. Environment variables (MARGINALIA_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::SortOrder;

/// Environment variable prefix
const ENV_PREFIX: &str = "MARGINALIA";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "vault_dir",
    "highlights_folder",
    "insights_folder",
    "kobo_db",
    "sort_order",
    "import_all_books",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Root of the note vault
    #[serde(default = "default_vault_dir")]
    pub vault_dir: PathBuf,

    /// Folder (inside the vault) for book documents
    #[serde(default = "default_highlights_folder")]
    pub highlights_folder: String,

    /// Folder (inside the vault) for insight notes
    #[serde(default = "default_insights_folder")]
    pub insights_folder: String,

    /// Path to KoboReader.sqlite
    #[serde(default)]
    pub kobo_db: Option<PathBuf>,

    /// Ordering of highlights within a book
    #[serde(default)]
    pub sort_order: SortOrder,

    /// Create placeholder notes for books without highlights
    #[serde(default)]
    pub import_all_books: bool,

    /// Log destination; stderr when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            highlights_folder: default_highlights_folder(),
            insights_folder: default_insights_folder(),
            kobo_db: None,
            sort_order: SortOrder::default(),
            import_all_books: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MARGINALIA_VAULT_DIR, MARGINALIA_KOBO_DB, ...)
    /// 2. Config file (~/.config/marginalia/config.toml or MARGINALIA_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit config file path
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        for key in CONFIG_KEYS {
            let var = format!("{}_{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Ok(val) = std::env::var(&var) {
                self.set(key, &val)
                    .with_context(|| format!("Invalid value in {}", var))?;
            }
        }
        Ok(())
    }

    /// Set a single key from its string form
    ///
    /// An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "vault_dir" => self.vault_dir = PathBuf::from(value),
            "highlights_folder" => self.highlights_folder = non_empty(key, value)?,
            "insights_folder" => self.insights_folder = non_empty(key, value)?,
            "kobo_db" => self.kobo_db = optional_path(value),
            "sort_order" => {
                self.sort_order = value.parse().map_err(anyhow::Error::msg)?;
            }
            "import_all_books" => self.import_all_books = parse_flag(key, value)?,
            "log_file" => self.log_file = optional_path(value),
            other => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                other,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Create the vault directory if it does not exist yet
    pub fn ensure_vault_dir(&self) -> Result<()> {
        if !self.vault_dir.exists() {
            std::fs::create_dir_all(&self.vault_dir).with_context(|| {
                format!("Failed to create vault directory: {:?}", self.vault_dir)
            })?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MARGINALIA_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marginalia")
            .join("config.toml")
    }

    /// Book documents folder, relative to the vault
    pub fn highlights_path(&self) -> PathBuf {
        PathBuf::from(&self.highlights_folder)
    }

    /// Insight notes folder, relative to the vault
    pub fn insights_path(&self) -> PathBuf {
        PathBuf::from(&self.insights_folder)
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("'{}' cannot be empty", key);
    }
    Ok(value.to_string())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => bail!("Invalid value '{}' for '{}': expected true or false", value, key),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Get the default vault directory
fn default_vault_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marginalia")
}

fn default_highlights_folder() -> String {
    "Highlights".to_string()
}

fn default_insights_folder() -> String {
    "Insights".to_string()
}
