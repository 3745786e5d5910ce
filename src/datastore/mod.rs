pub mod fetcher;
pub mod lifecycle;
pub mod poller;
pub mod pubsub;

#[cfg(test)]
pub(crate) mod test_server;

pub use fetcher::{Fetch, FetchError, HttpFetcher};
pub use lifecycle::Lifecycle;
pub use poller::{Poller, PollerState};
pub use pubsub::{SubscriberId, Subscription};
