use super::Config;
use crate::error::ConfigError;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load `~/.stepwise/config.toml`, writing defaults there on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Load("Could not find home directory".into()))?;
        Self::load_or_init_in(&home.join(".stepwise"))
    }

    pub(crate) fn load_or_init_in(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join("config.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        fs::create_dir_all(dir)?;
        let config = Self {
            config_path,
            ..Self::default()
        };
        config.save()?;
        tracing::info!(path = %config.config_path.display(), "config.initialized");
        Ok(config)
    }

    /// Load an explicit config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::Load(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::Load(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.config_path = PathBuf::from(path);
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("Failed to serialize config: {e}")))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }
}
