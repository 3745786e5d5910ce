use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use crate::datastore::fetcher::{Fetch, HttpFetcher};
use crate::datastore::lifecycle::Lifecycle;
use crate::datastore::pubsub::{SubscriberId, Subscribers, Subscription};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollerState {
    Created,
    Polling,
    Stopped,
}

/// Polls one endpoint and keeps its last decoded snapshot.
///
/// The snapshot is available through [`Poller::get_data`] and pushed to every
/// [`Subscription`] that is waiting when a fetch succeeds.
pub struct Poller<T, F = HttpFetcher> {
    name: String,
    url: String,
    interval: Duration,
    credential: Option<String>,
    fetcher: F,
    data: RwLock<T>,
    subscribers: Subscribers<T>,
    state: Mutex<PollerState>,
}

impl<T> Poller<T, HttpFetcher>
where
    T: DeserializeOwned + Default + Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        interval: Duration,
        credential: Option<String>,
    ) -> Self {
        Self::with_fetcher(name, url, interval, credential, HttpFetcher::default())
    }
}

impl<T, F> Poller<T, F>
where
    T: DeserializeOwned + Default + Clone + Send + Sync + 'static,
    F: Fetch,
{
    pub fn with_fetcher(
        name: impl Into<String>,
        url: impl Into<String>,
        interval: Duration,
        credential: Option<String>,
        fetcher: F,
    ) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");

        Self {
            name: name.into(),
            url: url.into(),
            interval,
            credential: credential.filter(|c| !c.is_empty()),
            fetcher,
            data: RwLock::new(T::default()),
            subscribers: Subscribers::new(),
            state: Mutex::new(PollerState::Created),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        *self.state.lock()
    }

    /// Spawns the polling loop under `lifecycle`.
    ///
    /// # Panics
    ///
    /// If polling was already started on this instance.
    pub fn start_polling(self: &Arc<Self>, lifecycle: &Lifecycle) -> JoinHandle<()> {
        {
            let mut state = self.state.lock();
            assert_eq!(
                *state,
                PollerState::Created,
                "polling already started for {}",
                self.name
            );
            *state = PollerState::Polling;
        }

        let span = info_span!("poller", name = %self.name, url = %self.url);
        let poller = Arc::clone(self);
        let token = lifecycle.token();

        lifecycle.spawn(async move { poller.run(token).await }.instrument(span))
    }

    async fn run(&self, token: CancellationToken) {
        debug!(interval = ?self.interval, "starting polling");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                fetched = self.fetcher.fetch::<T>(&self.url, self.credential.as_deref()) => fetched,
            };

            match fetched {
                Ok(snapshot) => {
                    self.update_data(snapshot.clone());
                    self.publish(&snapshot);
                }
                Err(error) => {
                    let status = error.status().map(|status| status.as_u16());
                    error!(%error, ?status, "error fetching data");
                }
            }
        }

        *self.state.lock() = PollerState::Stopped;
        debug!("stopped polling");
    }

    fn update_data(&self, snapshot: T) {
        *self.data.write() = snapshot;
    }

    fn publish(&self, snapshot: &T) -> usize {
        self.subscribers.publish(snapshot)
    }

    /// Last successfully fetched snapshot, or `T::default()` before the first one.
    pub fn get_data(&self) -> T {
        self.data.read().clone()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.subscribers.subscribe()
    }

    /// # Panics
    ///
    /// If `id` is not currently subscribed to this poller.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.unsubscribe(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T, F> fmt::Debug for Poller<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("interval", &self.interval)
            .field("has_credential", &self.credential.is_some())
            .field("state", &*self.state.lock())
            .finish()
    }
}
