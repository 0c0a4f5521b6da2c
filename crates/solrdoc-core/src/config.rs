//! Configuration types for solrdoc.
//!
//! [`Config::load`] reads `~/.config/solrdoc/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[engine]
alias      = "default"
batch_size = 1000

[projection]
fields_inheritance = false

[server]
bind        = "127.0.0.1:8383"
redirect_to = "/admin/solrdoc/indexes/"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/solrdoc/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[engine]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_alias() -> String { "default".to_string() }
fn default_batch_size() -> usize { 1000 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            batch_size: default_batch_size(),
        }
    }
}

/// `[projection]` section of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectionConfig {
    /// Apply the requested field list to nested children too.
    #[serde(default)]
    pub fields_inheritance: bool,
}

/// `[server]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Where `POST /fetch/` redirects once the bookkeeping rows are synced.
    #[serde(default = "default_redirect_to")]
    pub redirect_to: String,
}

fn default_bind() -> String { "127.0.0.1:8383".to_string() }
fn default_redirect_to() -> String { "/admin/solrdoc/indexes/".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            redirect_to: default_redirect_to(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/solrdoc/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file layered on top of the built-in defaults. A
    /// missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("solrdoc")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
