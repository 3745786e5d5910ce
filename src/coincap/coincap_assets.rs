use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::coincap::utils::{option_string_f64, string_f64, timestamp_to_utc};

/// One entry of `/v2/assets`, also the `data` of `/v2/assets/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoincapAsset {
    pub id: String,
    pub rank: String,
    pub symbol: String,
    pub name: String,

    #[serde(deserialize_with = "string_f64")]
    pub supply: f64,

    #[serde(default, deserialize_with = "option_string_f64")]
    pub max_supply: Option<f64>,

    #[serde(deserialize_with = "string_f64")]
    pub market_cap_usd: f64,

    #[serde(rename = "volumeUsd24Hr", deserialize_with = "string_f64")]
    pub volume_usd_24_hr: f64,

    #[serde(deserialize_with = "string_f64")]
    pub price_usd: f64,

    #[serde(rename = "changePercent24Hr", deserialize_with = "string_f64")]
    pub change_percent_24_hr: f64,

    /* null for freshly listed assets */
    #[serde(rename = "vwap24Hr", default, deserialize_with = "option_string_f64")]
    pub vwap_24_hr: Option<f64>,

    #[serde(default)]
    pub explorer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoincapAssetsResponse {
    pub data: Vec<CoincapAsset>,
    pub timestamp: i64,
}

impl CoincapAssetsResponse {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.timestamp)
    }

    pub fn find(&self, id: &str) -> Option<&CoincapAsset> {
        self.data.iter().find(|asset| asset.id == id)
    }
}
