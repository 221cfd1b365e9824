//! Configuration: `[server]`, `[storage]`, and `[upload]` sections, loaded
//! from a TOML file with per-field defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What to do when the URL guard denies an upload candidate.
///
/// `Reject` hard-fails the operation before any fetch. `StoreReference`
/// keeps the legacy behavior of persisting the raw URL string as a remote
/// reference without ever fetching it — no server-side request happens, but
/// an unvalidated external reference ends up stored, so it stays opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnsafeUrlPolicy {
    #[default]
    Reject,
    StoreReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow binding to non-localhost addresses (default: false)
    #[serde(default)]
    pub allow_public_bind: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_public_bind: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory the key-file server is restricted to.
    #[serde(default = "default_key_files_dir")]
    pub key_files_dir: String,
    /// Directory uploaded profile images are committed to.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    /// SQLite database holding users and session tokens.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_files_dir: default_key_files_dir(),
            uploads_dir: default_uploads_dir(),
            database_path: default_database_path(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn key_files_dir(&self) -> PathBuf {
        expand(&self.key_files_dir)
    }

    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        expand(&self.uploads_dir)
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        expand(&self.database_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub on_unsafe_url: UnsafeUrlPolicy,
    /// Outbound fetch deadline in seconds (default: 30)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// DNS resolution deadline in seconds (default: 5)
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    /// Redirect hops re-validated and followed before giving up (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            on_unsafe_url: UnsafeUrlPolicy::default(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            dns_timeout_secs: default_dns_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Config {
    /// Load from `path` when given (the file must exist), otherwise from the
    /// default location, falling back to defaults when no file is present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::from_file(explicit),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// `$XDG_CONFIG_HOME/wardgate/config.toml` (or the platform equivalent).
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "wardgate")
            .map_or_else(|| PathBuf::from("config.toml"), |d| d.config_dir().join("config.toml"))
    }

    /// Write the default config to `path`, creating parent directories.
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let rendered = toml::to_string_pretty(&Self::default()).context("render default config")?;
        std::fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_key_files_dir() -> String {
    "encryptionkeys".into()
}

fn default_uploads_dir() -> String {
    "uploads".into()
}

fn default_database_path() -> String {
    "wardgate.db".into()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_dns_timeout_secs() -> u64 {
    5
}

fn default_max_redirects() -> usize {
    5
}
