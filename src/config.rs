use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quote_sync_core::identity::is_valid_prefix;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            id_prefix: default_id_prefix(),
            default_category: default_category(),
            placeholder_text: default_placeholder_text(),
        }
    }
}

fn default_remote_url() -> String {
    "https://jsonplaceholder.typicode.com/posts".to_string()
}
fn default_batch_size() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_id_prefix() -> String {
    "srv".to_string()
}
fn default_category() -> String {
    "Server".to_string()
}
fn default_placeholder_text() -> String {
    "Server quote".to_string()
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    5
}

impl NotifyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Quotes the store starts with when no durable state exists.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub seed: Vec<SeedQuote>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedQuote {
    pub text: String,
    pub category: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.remote.url.trim().is_empty() {
        anyhow::bail!("remote.url must not be empty");
    }
    if config.remote.batch_size == 0 {
        anyhow::bail!("remote.batch_size must be > 0");
    }
    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }
    if !is_valid_prefix(&config.remote.id_prefix) {
        anyhow::bail!(
            "remote.id_prefix '{}' must contain a character outside [0-9a-f]",
            config.remote.id_prefix
        );
    }
    if config.remote.default_category.trim().is_empty() {
        anyhow::bail!("remote.default_category must not be empty");
    }
    if config.remote.placeholder_text.trim().is_empty() {
        anyhow::bail!("remote.placeholder_text must not be empty");
    }
    if config.sync.interval_secs == 0 {
        anyhow::bail!("sync.interval_secs must be > 0");
    }
    for (i, seed) in config.store.seed.iter().enumerate() {
        if seed.text.trim().is_empty() || seed.category.trim().is_empty() {
            anyhow::bail!("store.seed[{}] needs non-empty text and category", i);
        }
    }
    Ok(())
}
