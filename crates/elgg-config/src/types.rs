//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Image library used by the image service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProcessor {
    Gd,
    Imagick,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        ImageProcessor::Gd
    }
}

/// Settings of a single cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: String,
    pub secure: bool,
    pub httponly: bool,
    /// Lifetime in seconds, 0 for a browser-session cookie
    pub expire: u64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "Elgg".to_string(),
            path: "/".to_string(),
            domain: String::new(),
            secure: false,
            httponly: true,
            expire: 0,
        }
    }
}

/// Session and remember-me cookie settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    pub session: CookieSettings,
    pub remember_me: CookieSettings,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            session: CookieSettings::default(),
            remember_me: CookieSettings {
                name: "elggperm".to_string(),
                expire: 30 * 24 * 60 * 60,
                ..CookieSettings::default()
            },
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public site URL, always ends with `/`
    pub wwwroot: String,
    /// Data directory, always ends with `/`
    pub dataroot: String,
    /// Cache directory, defaults to `dataroot`
    pub cacheroot: String,

    pub dbhost: String,
    pub dbport: u16,
    pub dbname: String,
    pub dbuser: String,
    pub dbpass: String,
    pub dbprefix: String,

    /// Attach timers to boot, events, plugins, router and system cache
    pub enable_profiling: bool,
    /// Attach a timer to the database handle
    pub profiling_sql: bool,
    /// `None` defers to the value stored in the config table
    pub simplecache_enabled: Option<bool>,
    pub image_processor: ImageProcessor,
    pub memcache: bool,
    /// `host:port` entries
    pub memcache_servers: Vec<String>,
    pub autoloader_skip_storage: bool,
    pub language: String,
    /// Injected early when present; otherwise read from the config table
    pub site_secret: Option<String>,
    /// Log level name (`debug`, `info`, `notice`, `warning`, `error`)
    pub debug: Option<String>,
    pub cookies: CookieConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wwwroot: "http://localhost/".to_string(),
            dataroot: std::env::temp_dir()
                .join("elgg-data")
                .to_string_lossy()
                .into_owned(),
            cacheroot: String::new(),
            dbhost: "localhost".to_string(),
            dbport: 3306,
            dbname: "elgg".to_string(),
            dbuser: String::new(),
            dbpass: String::new(),
            dbprefix: "elgg_".to_string(),
            enable_profiling: false,
            profiling_sql: false,
            simplecache_enabled: None,
            image_processor: ImageProcessor::default(),
            memcache: false,
            memcache_servers: Vec::new(),
            autoloader_skip_storage: false,
            language: "en".to_string(),
            site_secret: None,
            debug: None,
            cookies: CookieConfig::default(),
        }
    }
}

impl Config {
    /// A normalised default configuration
    pub fn new() -> Self {
        let mut config = Self::default();
        config.normalize();
        config
    }

    /// Cookie settings for the session and remember-me cookies
    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookies
    }

    /// Append trailing slashes to roots and default `cacheroot`
    pub fn normalize(&mut self) {
        for root in [&mut self.wwwroot, &mut self.dataroot, &mut self.cacheroot] {
            if !root.is_empty() && !root.ends_with('/') {
                root.push('/');
            }
        }
        if self.cacheroot.is_empty() {
            self.cacheroot = self.dataroot.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wwwroot.is_empty() {
            return Err(ConfigError::Validation("wwwroot must be set".to_string()));
        }
        if self.dataroot.is_empty() {
            return Err(ConfigError::Validation("dataroot must be set".to_string()));
        }
        if self.memcache && self.memcache_servers.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "memcache_servers contains an empty entry".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory of the file-backed system cache
    pub fn system_cache_path(&self) -> PathBuf {
        PathBuf::from(&self.cacheroot).join("system_cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_slashes_and_cacheroot() {
        let mut config = Config {
            wwwroot: "https://example.org".to_string(),
            dataroot: "/var/elgg".to_string(),
            cacheroot: String::new(),
            ..Config::default()
        };
        config.normalize();

        assert_eq!(config.wwwroot, "https://example.org/");
        assert_eq!(config.dataroot, "/var/elgg/");
        assert_eq!(config.cacheroot, "/var/elgg/");
        assert_eq!(config.system_cache_path(), PathBuf::from("/var/elgg/system_cache"));
    }

    #[test]
    fn test_validate_rejects_empty_roots() {
        let config = Config {
            wwwroot: String::new(),
            ..Config::new()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = Config {
            dataroot: String::new(),
            ..Config::new()
        };
        assert!(config.validate().is_err());

        assert!(Config::new().validate().is_ok());
    }

    #[test]
    fn test_default_cookies() {
        let config = Config::new();
        assert_eq!(config.cookie_config().session.name, "Elgg");
        assert_eq!(config.cookie_config().remember_me.name, "elggperm");
        assert!(config.cookie_config().remember_me.expire > 0);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            wwwroot = "https://social.example/"
            enable_profiling = true
            image_processor = "imagick"

            [cookies.remember_me]
            name = "remember"
            "#,
        )
        .unwrap();

        assert!(config.enable_profiling);
        assert_eq!(config.image_processor, ImageProcessor::Imagick);
        assert_eq!(config.cookies.remember_me.name, "remember");
        assert_eq!(config.cookies.session.name, "Elgg");
        assert_eq!(config.simplecache_enabled, None);
    }
}
