use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::coincap::coincap_assets::CoincapAsset;
use crate::coincap::utils::timestamp_to_utc;

/// Response of `/v2/assets/{id}`: a single asset under `data`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoincapAssetIdResponse {
    pub data: CoincapAsset,
    pub timestamp: i64,
}

impl CoincapAssetIdResponse {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.timestamp)
    }
}
