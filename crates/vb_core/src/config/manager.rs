//! Config manager for loading and saving settings.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - `load_or_create` seeds a default file on first run
//! - Environment overrides for the credential fields

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::Settings;

/// Environment variable that overrides `providers.api_token`.
pub const API_TOKEN_ENV: &str = "VOICEBRIEF_API_TOKEN";

/// Environment variable that overrides `paths.cookies_file`.
pub const COOKIES_FILE_ENV: &str = "VOICEBRIEF_COOKIES_FILE";

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Note: Changes made here are only in memory until `save()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't exist.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            self.settings = toml::from_str(&content)?;
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Apply environment overrides for credential fields.
    ///
    /// The config file is never the only place secrets can live; deployment
    /// environments inject them here instead.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.is_empty() {
                self.settings.providers.api_token = token;
            }
        }
        if let Ok(cookies) = std::env::var(COOKIES_FILE_ENV) {
            if !cookies.is_empty() {
                self.settings.paths.cookies_file = cookies;
            }
        }
    }

    /// Ensure all configured directories exist.
    ///
    /// Creates the working, extraction, and logs directories if missing.
    /// Should be called after `load_or_create()`.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let dirs = [
            &self.settings.paths.work_root,
            &self.settings.paths.extract_root,
            &self.settings.paths.logs_folder,
        ];

        for dir in dirs {
            let path = PathBuf::from(dir);
            if !path.exists() {
                fs::create_dir_all(&path)?;
            }
        }

        Ok(())
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let mut content = String::from("# VoiceBrief configuration\n\n");
        content.push_str(&toml::to_string_pretty(&self.settings)?);
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Write content to the config file atomically.
    ///
    /// Writes to a temp file first, then renames.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("voicebrief.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[pipeline]"));
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("voicebrief.toml");

        fs::write(
            &config_path,
            "[pipeline]\nmax_concurrent_runs = 4\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().pipeline.max_concurrent_runs, 4);
        // Untouched sections keep their defaults.
        assert_eq!(manager.settings().providers.summary_model, "gpt-4o");
    }

    #[test]
    fn load_fails_on_missing_file() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn env_override_replaces_token() {
        let mut manager = ConfigManager::new("unused.toml");
        std::env::set_var(API_TOKEN_ENV, "tok-from-env");
        manager.apply_env_overrides();
        std::env::remove_var(API_TOKEN_ENV);

        assert_eq!(manager.settings().providers.api_token, "tok-from-env");
    }

    #[test]
    fn ensure_dirs_creates_roots() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("voicebrief.toml"));
        manager.settings_mut().paths.work_root =
            dir.path().join("work").display().to_string();
        manager.settings_mut().paths.extract_root =
            dir.path().join("upload").display().to_string();
        manager.settings_mut().paths.logs_folder =
            dir.path().join("logs").display().to_string();

        manager.ensure_dirs_exist().unwrap();

        assert!(dir.path().join("work").is_dir());
        assert!(dir.path().join("upload").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("voicebrief.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
