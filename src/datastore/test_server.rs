use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::datastore::fetcher::HttpFetcher;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MockValue {
    pub value: String,
}

#[derive(Debug)]
struct EndpointState {
    status: AtomicU16,
    body: Mutex<Vec<u8>>,
    hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

/// Local HTTP endpoint whose status and body can be switched while a poller runs.
pub struct MockEndpoint {
    address: SocketAddr,
    state: Arc<EndpointState>,
}

impl MockEndpoint {
    pub async fn spawn(value: &str) -> Self {
        let state = Arc::new(EndpointState {
            status: AtomicU16::new(200),
            body: Mutex::new(body_for(value)),
            hits: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
        });

        let router = Router::new()
            .route("/", get(snapshot))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { address, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.address)
    }

    pub fn set_value(&self, value: &str) {
        *self.state.body.lock() = body_for(value);
    }

    pub fn set_raw_body(&self, body: &str) {
        self.set_raw_bytes(body.as_bytes().to_vec());
    }

    pub fn set_raw_bytes(&self, body: Vec<u8>) {
        *self.state.body.lock() = body;
    }

    pub fn set_status(&self, status: reqwest::StatusCode) {
        self.state.status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }
}

/// Fetcher that ignores any proxy configured in the environment.
pub fn local_fetcher() -> HttpFetcher {
    HttpFetcher::new(reqwest::Client::builder().no_proxy().build().unwrap())
}

fn body_for(value: &str) -> Vec<u8> {
    serde_json::json!({ "value": value }).to_string().into_bytes()
}

async fn snapshot(State(state): State<Arc<EndpointState>>, headers: HeaderMap) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock() = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = state.body.lock().clone();

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}
