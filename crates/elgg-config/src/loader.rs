//! Loading configuration from a settings file and the environment

use std::path::{Path, PathBuf};

use config::{Environment, File};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::types::Config;

/// Loads [`Config`] from an optional TOML settings file, overridden by
/// prefixed environment variables (`ELGG_DBHOST`, `ELGG_COOKIES__SESSION__NAME`, ...).
pub struct ConfigLoader {
    settings_path: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            settings_path: Self::default_settings_path(),
            env_prefix: "ELGG".to_string(),
        }
    }

    /// Create with custom settings path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: path.into(),
            ..Self::new()
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn default_settings_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("elgg")
            .join("settings.toml")
    }

    /// Load, normalise and validate the configuration
    pub fn load(&self) -> Result<Config> {
        debug!("Loading settings from {}", self.settings_path.display());

        let settings = config::Config::builder()
            .add_source(File::from(self.settings_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("memcache_servers"),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.normalize();
        config.validate()?;

        info!(
            "Configuration loaded (wwwroot: {}, profiling: {})",
            config.wwwroot, config.enable_profiling
        );
        Ok(config)
    }

    /// Write a configuration back to the settings file
    pub fn save(&self, config: &Config) -> Result<()> {
        let toml = toml::to_string(config)?;
        let parent = self.settings_path.parent().ok_or_else(|| {
            ConfigError::Validation(format!(
                "settings path has no parent: {}",
                self.settings_path.display()
            ))
        })?;
        std::fs::create_dir_all(parent)?;
        std::fs::write(&self.settings_path, toml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
            wwwroot = "https://example.org"
            dataroot = "/srv/elgg/data"
            profiling_sql = true
            memcache = true
            memcache_servers = ["127.0.0.1:11211"]
            "#,
        )
        .unwrap();

        let config = ConfigLoader::with_path(&path)
            .with_env_prefix("ELGG_TEST_FILE")
            .load()
            .unwrap();

        assert_eq!(config.wwwroot, "https://example.org/");
        assert_eq!(config.cacheroot, "/srv/elgg/data/");
        assert!(config.profiling_sql);
        assert_eq!(config.memcache_servers, vec!["127.0.0.1:11211".to_string()]);
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_path(dir.path().join("absent.toml"))
            .with_env_prefix("ELGG_TEST_ABSENT")
            .load()
            .unwrap();

        assert_eq!(config.wwwroot, "http://localhost/");
        assert!(!config.enable_profiling);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "dbhost = \"db.internal\"\n").unwrap();

        std::env::set_var("ELGG_TEST_ENV_DBHOST", "db.override");
        std::env::set_var("ELGG_TEST_ENV_ENABLE_PROFILING", "true");
        let config = ConfigLoader::with_path(&path)
            .with_env_prefix("ELGG_TEST_ENV")
            .load();
        std::env::remove_var("ELGG_TEST_ENV_DBHOST");
        std::env::remove_var("ELGG_TEST_ENV_ENABLE_PROFILING");

        let config = config.unwrap();
        assert_eq!(config.dbhost, "db.override");
        assert!(config.enable_profiling);
    }

    #[test]
    #[serial]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_path(dir.path().join("nested").join("settings.toml"))
            .with_env_prefix("ELGG_TEST_SAVE");

        let mut config = Config::new();
        config.language = "fr".to_string();
        config.site_secret = Some("z0123456789".to_string());
        loader.save(&config).unwrap();

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.language, "fr");
        assert_eq!(loaded.site_secret.as_deref(), Some("z0123456789"));
    }
}
