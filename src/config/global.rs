//! Global configuration stored at `~/.stackhub/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{DEFAULT_REMOTE_TIMEOUT, ENCRYPTION_KEY_ENV, MAX_EXPANSION_DEPTH};
use crate::storage::{Codec, EncryptionKey, StorageOptions, StorageSession};

const fn default_true() -> bool {
    true
}

const fn default_remote_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT.as_secs()
}

const fn default_max_depth() -> usize {
    MAX_EXPANSION_DEPTH
}

/// Storage write and read policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Gzip payloads before storing them.
    #[serde(default = "default_true")]
    pub gzip: bool,

    /// Encrypt payloads whenever any replica is remote.
    #[serde(default = "default_true")]
    pub encrypt_remote: bool,

    /// Passphrase, or 64 hex characters used as the raw AES-256 key.
    ///
    /// `STACKHUB_ENCRYPTION_KEY` takes precedence when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,

    /// Timeout in seconds for each remote stat, read or write.
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,

    /// Overwrite locked replicas and tolerate throttling on a single replica.
    #[serde(default)]
    pub force: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gzip: true,
            encrypt_remote: true,
            encryption_key: None,
            remote_timeout_secs: default_remote_timeout_secs(),
            force: false,
        }
    }
}

impl StorageConfig {
    /// The configured key, with the environment taking precedence.
    #[must_use]
    pub fn resolve_key(&self, env_key: Option<String>) -> Option<EncryptionKey> {
        env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.encryption_key.clone())
            .map(|secret| EncryptionKey::from_secret(&secret))
    }

    #[must_use]
    pub fn options(&self) -> StorageOptions {
        StorageOptions {
            gzip: self.gzip,
            encrypt_remote: self.encrypt_remote,
            remote_timeout: Duration::from_secs(self.remote_timeout_secs),
            force: self.force,
        }
    }

    /// Build a storage session, reading the key override from the process environment.
    #[must_use]
    pub fn session(&self) -> StorageSession {
        let key = self.resolve_key(std::env::var(ENCRYPTION_KEY_ENV).ok());
        StorageSession::new(self.options(), Codec::new(self.gzip, key))
    }
}

/// Parameter resolution policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Expansion depth at which a value is abandoned as a probable loop.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Downgrade resolution errors to warnings.
    #[serde(default)]
    pub force: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            force: false,
        }
    }
}

/// Global configuration for stackhub.
///
/// ```toml
/// [storage]
/// gzip = true
/// encrypt_remote = true
/// encryption_key = "correct horse battery staple"
/// remote_timeout_secs = 30
///
/// [resolution]
/// max_depth = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub resolution: ResolutionConfig,
}

impl HubConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to `path` as pretty TOML.
    ///
    /// The file may hold an encryption passphrase, so on Unix it is made
    /// readable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        crate::utils::atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform path of the global configuration file.
    ///
    /// - **Windows**: `%LOCALAPPDATA%\stackhub\config.toml`
    /// - **Unix/macOS**: `~/.stackhub/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the home or local data directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("stackhub")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".stackhub")
        };

        Ok(config_dir.join("config.toml"))
    }
}
