use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use coincap_poller::coincap::coincap_asset_id::CoincapAssetIdResponse;
use coincap_poller::coincap::coincap_assets::CoincapAssetsResponse;
use coincap_poller::coincap::coincap_config::CoincapConfig;
use coincap_poller::coincap::coincap_markets::CoincapMarketsResponse;
use coincap_poller::coincap::polling_config::PollingConfig;
use coincap_poller::datastore::{HttpFetcher, Lifecycle, Poller};
use coincap_poller::logging::{self, LogLevel};

type Store<T> = Arc<Poller<T>>;

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, value_enum, default_value = "debug")]
    pub log_level: LogLevel,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub run_for: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    logging::init(args.log_level);

    let coincap = CoincapConfig::from_env()?;
    let polling = PollingConfig::load()?;
    let fetcher = HttpFetcher::with_timeout(polling.request_timeout())
        .context("failed to build http client")?;

    info!(host = %coincap.host_name, asset = %polling.asset_id, "coincap started");

    let assets: Store<CoincapAssetsResponse> = Arc::new(Poller::with_fetcher(
        "assets",
        coincap.endpoint_url(&polling.assets_path())?.to_string(),
        polling.assets_interval(),
        coincap.api_key.clone(),
        fetcher.clone(),
    ));
    let markets: Store<CoincapMarketsResponse> = Arc::new(Poller::with_fetcher(
        "markets",
        coincap.endpoint_url(&polling.markets_path())?.to_string(),
        polling.markets_interval(),
        coincap.api_key.clone(),
        fetcher.clone(),
    ));
    let asset: Store<CoincapAssetIdResponse> = Arc::new(Poller::with_fetcher(
        format!("{}price", polling.asset_id),
        coincap.endpoint_url(&polling.asset_path())?.to_string(),
        polling.asset_interval(),
        coincap.api_key.clone(),
        fetcher,
    ));

    let lifecycle = Lifecycle::new();

    assets.start_polling(&lifecycle);
    markets.start_polling(&lifecycle);
    asset.start_polling(&lifecycle);

    let tracked_id = polling.asset_id.clone();
    spawn_listener(&lifecycle, &assets, move |snapshot| {
        info!(
            size = snapshot.data.len(),
            observed_at = ?snapshot.observed_at(),
            tracked_price = ?snapshot.find(&tracked_id).map(|asset| asset.price_usd),
            "received assets"
        );
    });
    spawn_listener(&lifecycle, &markets, |snapshot| {
        let top = snapshot
            .data
            .iter()
            .max_by(|a, b| a.volume_percent.total_cmp(&b.volume_percent));
        info!(
            size = snapshot.data.len(),
            observed_at = ?snapshot.observed_at(),
            top_pair = ?top.map(|market| market.pair()),
            top_exchange = ?top.map(|market| market.exchange_id.as_str()),
            "received markets"
        );
    });
    spawn_listener(&lifecycle, &asset, |snapshot| {
        info!(
            name = %snapshot.data.name,
            price = snapshot.data.price_usd,
            observed_at = ?snapshot.observed_at(),
            "received asset price"
        );
    });

    debug!(tasks = lifecycle.task_count(), "pollers and listeners running");

    match args.run_for {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                signal = tokio::signal::ctrl_c() => signal.context("failed to listen for ctrl-c")?,
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?,
    }

    lifecycle.shutdown().await;

    let last_asset = asset.get_data();
    info!(
        assets = assets.get_data().data.len(),
        markets = markets.get_data().data.len(),
        asset = %last_asset.data.name,
        price = last_asset.data.price_usd,
        "last known snapshots"
    );

    Ok(())
}

fn spawn_listener<T, L>(lifecycle: &Lifecycle, store: &Store<T>, on_snapshot: L)
where
    T: DeserializeOwned + Default + Clone + Send + Sync + 'static,
    L: Fn(&T) + Send + 'static,
{
    let store = store.clone();
    let scope = lifecycle.clone();

    lifecycle.spawn(async move {
        let mut subscription = store.subscribe();

        loop {
            tokio::select! {
                _ = scope.cancelled() => break,
                snapshot = subscription.recv() => match snapshot {
                    Some(snapshot) => on_snapshot(&snapshot),
                    None => {
                        warn!(store = store.name(), "subscription closed");
                        break;
                    }
                },
            }
        }

        if !subscription.is_closed() {
            store.unsubscribe(subscription.id());
        }
    });
}
