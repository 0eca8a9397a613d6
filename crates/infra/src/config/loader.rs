//! Configuration loader
//!
//! Loads the store configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Searches several paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CREDSTORE_DB_PATH`: Database file path (required)
//! - `CREDSTORE_DB_POOL_SIZE`: Connection pool size
//! - `CREDSTORE_DB_ENCRYPTION_KEY`: SQLCipher page key
//! - `CREDSTORE_ENCRYPTION_KEY`: Active key, 64 hex characters
//! - `CREDSTORE_ENCRYPTION_PASSWORD`: Active key as a passphrase, used when
//!   `CREDSTORE_ENCRYPTION_KEY` is unset
//! - `CREDSTORE_PREVIOUS_ENCRYPTION_KEYS`: Comma-separated inactive hex keys
//! - `CREDSTORE_ROTATION_BATCH_SIZE`: Versions re-encrypted per page
//! - `CREDSTORE_PERMISSIONS_ENFORCE`: Whether ACLs are checked (true/false)
//! - `CREDSTORE_LOG_LEVEL`: Default `EnvFilter` directive
//! - `CREDSTORE_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. The file named by `CREDSTORE_CONFIG`
//! 2. `./credstore.toml` or `./credstore.json`
//! 3. `./config/credstore.toml` or `./config/credstore.json`
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};

use credstore_domain::{
    Config, CredStoreError, DatabaseConfig, EncryptionConfig, KeyDescriptor, KeySource,
    LoggingConfig, PermissionsConfig, Result, RotationConfig,
};

const CONFIG_ENV: &str = "CREDSTORE_CONFIG";

/// Load and validate configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `CredStoreError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails [`Config::validate`]
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `CREDSTORE_DB_PATH` and one of `CREDSTORE_ENCRYPTION_KEY` or
/// `CREDSTORE_ENCRYPTION_PASSWORD` must be present; everything else falls
/// back to its default.
///
/// # Errors
/// Returns `CredStoreError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let defaults = DatabaseConfig::default();
    let database = DatabaseConfig {
        path: env_var("CREDSTORE_DB_PATH")?,
        pool_size: env_parse("CREDSTORE_DB_POOL_SIZE", defaults.pool_size)?,
        encryption_key: std::env::var("CREDSTORE_DB_ENCRYPTION_KEY").ok(),
        ..defaults
    };

    let active = match std::env::var("CREDSTORE_ENCRYPTION_KEY") {
        Ok(value) => KeySource::Hex { value },
        Err(_) => KeySource::Password { value: env_var("CREDSTORE_ENCRYPTION_PASSWORD")? },
    };
    let mut keys = vec![KeyDescriptor { source: active, active: true }];
    if let Ok(previous) = std::env::var("CREDSTORE_PREVIOUS_ENCRYPTION_KEYS") {
        keys.extend(
            previous
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| KeyDescriptor {
                    source: KeySource::Hex { value: value.to_string() },
                    active: false,
                }),
        );
    }

    let logging_defaults = LoggingConfig::default();
    Ok(Config {
        database,
        encryption: EncryptionConfig { keys },
        rotation: RotationConfig {
            batch_size: env_parse(
                "CREDSTORE_ROTATION_BATCH_SIZE",
                RotationConfig::default().batch_size,
            )?,
        },
        permissions: PermissionsConfig {
            enforce: env_bool(
                "CREDSTORE_PERMISSIONS_ENFORCE",
                PermissionsConfig::default().enforce,
            ),
        },
        logging: LoggingConfig {
            level: std::env::var("CREDSTORE_LOG_LEVEL").unwrap_or(logging_defaults.level),
            json: env_bool("CREDSTORE_LOG_JSON", logging_defaults.json),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, searches several locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CredStoreError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CredStoreError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            CredStoreError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CredStoreError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CredStoreError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CredStoreError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(CredStoreError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search several paths for a configuration file
///
/// `CREDSTORE_CONFIG` wins when it names an existing file. Otherwise the
/// working directory, its `config/` subdirectory and the executable's
/// directory are searched for `credstore.toml` then `credstore.json`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        candidates.push(PathBuf::from(explicit));
    }

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join("config"));
    }
    let exe_dir = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf));
    if let Some(exe_dir) = exe_dir {
        roots.push(exe_dir);
    }
    for root in roots {
        candidates.push(root.join("credstore.toml"));
        candidates.push(root.join("credstore.json"));
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| {
            CredStoreError::config(format!("Missing required environment variable: {key}"))
        })
}

/// Parse an optional numeric environment variable, or `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CredStoreError::config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
