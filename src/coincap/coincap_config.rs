use std::env;
use std::fmt;

use anyhow::{Context, Result, anyhow};
use tracing::info;
use url::Url;

#[derive(Clone)]
pub struct CoincapConfig {
    pub host_name: String,
    pub api_key: Option<String>,
}

impl CoincapConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host_name = lookup("HOST_NAME")
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .ok_or_else(|| anyhow!("HOST_NAME not set"))?;

        let api_key = lookup("COINCAP_KEY").filter(|key| !key.is_empty());
        if api_key.is_none() {
            info!("COINCAP_KEY not set, a lower request quota per minute applies");
        }

        Ok(Self { host_name, api_key })
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let raw = format!("https://{}{}", self.host_name, path);

        Url::parse(&raw).with_context(|| format!("invalid endpoint url {raw}"))
    }
}

impl fmt::Debug for CoincapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoincapConfig")
            .field("host_name", &self.host_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
