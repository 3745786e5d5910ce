pub mod coincap_asset_id;
pub mod coincap_assets;
pub mod coincap_config;
pub mod coincap_markets;
pub mod polling_config;
pub mod utils;
