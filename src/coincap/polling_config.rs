use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Asset polled by the single-asset and markets endpoints.
    pub asset_id: String,

    pub assets_interval_ms: u64,
    pub markets_interval_ms: u64,
    pub asset_interval_ms: u64,

    /// Upper bound for one HTTP request, connect to last body byte.
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            asset_id: "bitcoin".to_string(),
            assets_interval_ms: 2_000,
            markets_interval_ms: 5_000,
            asset_interval_ms: 1_000,
            request_timeout_ms: 10_000,
        }
    }
}

static CONFIG: OnceCell<PollingConfig> = OnceCell::new();

impl PollingConfig {
    const FILE_NAME: &'static str = "coincap.yml";

    pub fn load() -> Result<&'static PollingConfig> {
        CONFIG.get_or_try_init(|| Self::load_from(Path::new(Self::FILE_NAME)))
    }

    pub fn load_from(path: &Path) -> Result<PollingConfig> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no polling config file, using defaults");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read polling config {}", path.display()));
            }
        };

        Self::from_yaml(&raw)
            .with_context(|| format!("failed to load polling config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<PollingConfig> {
        let config: PollingConfig =
            serde_yaml::from_str(raw).context("failed to parse polling config")?;

        config
            .validate()
            .context("polling config validation failed")?;

        Ok(config)
    }

    pub fn assets_interval(&self) -> Duration {
        Duration::from_millis(self.assets_interval_ms)
    }

    pub fn markets_interval(&self) -> Duration {
        Duration::from_millis(self.markets_interval_ms)
    }

    pub fn asset_interval(&self) -> Duration {
        Duration::from_millis(self.asset_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn assets_path(&self) -> String {
        "/v2/assets".to_string()
    }

    pub fn markets_path(&self) -> String {
        format!("/v2/assets/{}/markets", self.asset_id)
    }

    pub fn asset_path(&self) -> String {
        format!("/v2/assets/{}", self.asset_id)
    }

    fn validate(&self) -> Result<()> {
        if self.asset_id.trim().is_empty() || self.asset_id.contains('/') {
            bail!("asset_id must be a non-empty path segment");
        }
        if self.assets_interval_ms == 0 {
            bail!("assets_interval_ms must be > 0");
        }
        if self.markets_interval_ms == 0 {
            bail!("markets_interval_ms must be > 0");
        }
        if self.asset_interval_ms == 0 {
            bail!("asset_interval_ms must be > 0");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be > 0");
        }
        Ok(())
    }
}
