//! TOML-based configuration for pressdb.
//!
//! Supports a config file (pressdb.toml) with environment variable expansion
//! in path values.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${HOME}/sites/blog.sqlite"
//! dialect = "sqlite"
//! table_prefix = "wp_"
//!
//! [cache]
//! backend = "sqlite"
//! path = "$XDG_CACHE_HOME/pressdb/cache.db"
//! schema_ttl_seconds = 604800
//! query_ttl_seconds = 3600
//! query_cache_enabled = true
//!
//! [query]
//! column_policy = "strict"
//!
//! [logging]
//! level = "pressdb=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CacheStore, MemoryCache, QueryCache, SqliteCache};
use crate::schema::DEFAULT_SCHEMA_TTL;
use crate::sql::{ColumnPolicy, Dialect};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Failed to open cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub query: QuerySettings,
    pub logging: LoggingSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// Dialect statements are rendered in.
    pub dialect: Dialect,

    /// Prefix prepended to bare table names, e.g. `wp_`.
    pub table_prefix: String,
}

/// Which store backs the shared cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,

    /// Cache database for the `sqlite` backend. Defaults to
    /// `~/.pressdb/cache.db`.
    pub path: Option<String>,

    /// Lifetime of cached table schemas.
    pub schema_ttl_seconds: u64,

    /// Lifetime of cached query results.
    pub query_ttl_seconds: u64,

    pub query_cache_enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            path: None,
            schema_ttl_seconds: DEFAULT_SCHEMA_TTL.as_secs(),
            query_ttl_seconds: 3600,
            query_cache_enabled: false,
        }
    }
}

/// Query builder configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    pub column_policy: ColumnPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PRESSDB_CONFIG`
    /// 2. `./pressdb.toml`
    /// 3. `~/.config/pressdb/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var("PRESSDB_CONFIG") {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("pressdb.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pressdb").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let prefix = &self.database.table_prefix;
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SettingsError::InvalidConfig(format!(
                "table_prefix '{prefix}' may only contain letters, digits and '_'"
            )));
        }
        Ok(())
    }

    /// Prefixed table name, e.g. `posts` -> `wp_posts`.
    pub fn table_name(&self, name: &str) -> String {
        let prefix = &self.database.table_prefix;
        if prefix.is_empty() || name.starts_with(prefix.as_str()) {
            name.to_string()
        } else {
            format!("{prefix}{name}")
        }
    }

    /// Database file with environment variables expanded.
    pub fn database_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.database
            .path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }

    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.schema_ttl_seconds)
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.query_ttl_seconds)
    }

    /// Open the configured cache store.
    pub fn cache_store(&self) -> Result<Arc<dyn CacheStore>, SettingsError> {
        match self.cache.backend {
            CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
            CacheBackend::Sqlite => {
                let cache = match self.cache.path.as_deref() {
                    Some(path) => SqliteCache::open_at(expand_env_vars(path)?)?,
                    None => SqliteCache::open()?,
                };
                Ok(Arc::new(cache))
            }
        }
    }

    /// Query result cache over `store`, if enabled.
    pub fn query_cache(&self, store: Arc<dyn CacheStore>) -> Option<QueryCache> {
        self.cache
            .query_cache_enabled
            .then(|| QueryCache::new(store, Some(self.query_ttl())))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name: String = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next(); // consume '}'
            name
        } else {
            // $VAR ends at non-alphanumeric/underscore
            std::iter::from_fn(|| chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_'))
                .collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
