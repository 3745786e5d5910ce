use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::coincap::utils::{string_f64, timestamp_to_utc};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoincapMarket {
    pub exchange_id: String,
    pub base_id: String,
    pub quote_id: String,
    pub base_symbol: String,
    pub quote_symbol: String,

    #[serde(rename = "volumeUsd24Hr", deserialize_with = "string_f64")]
    pub volume_usd_24_hr: f64,

    #[serde(deserialize_with = "string_f64")]
    pub price_usd: f64,

    #[serde(deserialize_with = "string_f64")]
    pub volume_percent: f64,
}

impl CoincapMarket {
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base_symbol, self.quote_symbol)
    }
}

/// Response of `/v2/assets/{id}/markets`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoincapMarketsResponse {
    pub data: Vec<CoincapMarket>,
    pub timestamp: i64,
}

impl CoincapMarketsResponse {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.timestamp)
    }
}
