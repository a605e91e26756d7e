//! Configuration module
//!
//! Environment-driven settings for storage, key layout and the sanitization
//! step of the upload pipeline. `.env` files are honoured via `dotenvy`.

use std::env;

use crate::constants::DEFAULT_KEY_PREFIX;
use crate::storage_types::StorageBackend;

const MAX_FILE_SIZE_MB: usize = 50;
const LOCAL_STORAGE_PATH: &str = "./data/uploads";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub key_prefix: String,
    pub remove_exif: bool,
    pub max_file_size_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Local,
            local_storage_path: LOCAL_STORAGE_PATH.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            remove_exif: true,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.storage_backend,
        };

        let remove_exif = match lookup("REMOVE_EXIF") {
            Some(value) => value
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|_| anyhow::anyhow!("REMOVE_EXIF must be true or false"))?,
            None => defaults.remove_exif,
        };

        let max_file_size_mb = match lookup("MAX_FILE_SIZE_MB") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("MAX_FILE_SIZE_MB must be a valid number"))?,
            None => MAX_FILE_SIZE_MB,
        };

        let config = Config {
            storage_backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or(defaults.local_storage_path),
            key_prefix: lookup("KEY_PREFIX")
                .map(|p| p.trim().trim_matches('/').to_string())
                .unwrap_or(defaults.key_prefix),
            remove_exif,
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.key_prefix.is_empty() {
            return Err(anyhow::anyhow!("KEY_PREFIX must not be empty"));
        }

        if self.key_prefix.contains('/') || self.key_prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "KEY_PREFIX must be a single path segment without '..'"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.storage_backend == StorageBackend::Local
            && self.local_storage_path.trim().is_empty()
        {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set for the local storage backend"
            ));
        }

        Ok(())
    }
}
