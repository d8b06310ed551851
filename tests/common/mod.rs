//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use weighted_eds::cache::SnapshotCache;
use weighted_eds::config::{EnvoyConfig, HealthCheckConfig, RegistryConfig};
use weighted_eds::reconciler::{Reconciler, ReconcilerSettings};
use weighted_eds::registry::RegistryClient;
use weighted_eds::topology::TopologyBuilder;

pub const TAILNET: &str = "example.com";
pub const TOKEN: &str = "tskey-api-test";

/// What the mock registry answers with next.
#[derive(Clone)]
pub enum MockReply {
    Devices(Value),
    /// A device list served with a status other than 200.
    DevicesWithStatus(u16, Value),
    Status(u16),
    Raw(&'static str),
    Hang,
}

#[derive(Clone)]
pub struct MockRegistry {
    pub addr: SocketAddr,
    reply: Arc<Mutex<MockReply>>,
    hits: Arc<Mutex<u32>>,
}

impl MockRegistry {
    pub fn set(&self, reply: MockReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn set_devices(&self, devices: Value) {
        self.set(MockReply::Devices(json!({ "devices": devices })));
    }

    pub fn hits(&self) -> u32 {
        *self.hits.lock().unwrap()
    }

    pub fn config(&self) -> RegistryConfig {
        RegistryConfig {
            api_base_url: format!("http://{}", self.addr),
            tailnet: TAILNET.to_string(),
            api_token: TOKEN.to_string(),
            timeout_secs: 1,
        }
    }
}

async fn devices_handler(
    State(mock): State<MockRegistry>,
    Path(tailnet): Path<String>,
    headers: HeaderMap,
) -> Response {
    *mock.hits.lock().unwrap() += 1;

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN));
    if !authorized || tailnet != TAILNET {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let reply = mock.reply.lock().unwrap().clone();
    match reply {
        MockReply::Devices(body) => Json(body).into_response(),
        MockReply::DevicesWithStatus(code, body) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body),
        )
            .into_response(),
        MockReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        MockReply::Raw(body) => body.into_response(),
        MockReply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK.into_response()
        }
    }
}

/// Start a mock tailnet admin API on an ephemeral port.
pub async fn start_mock_registry(devices: Value) -> MockRegistry {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = MockRegistry {
        addr: listener.local_addr().unwrap(),
        reply: Arc::new(Mutex::new(MockReply::Devices(json!({ "devices": devices })))),
        hits: Arc::new(Mutex::new(0)),
    };

    let app = Router::new()
        .route("/api/v2/tailnet/{tailnet}/devices", get(devices_handler))
        .with_state(mock.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    mock
}

/// The three-device example: weights 1, 2 and 5, the last with two addresses.
pub fn three_devices() -> Value {
    json!([
        { "id": "1", "name": "a", "addresses": ["100.64.0.1"], "tags": ["tag:weight-1"] },
        { "id": "2", "name": "b", "addresses": ["100.64.0.2"], "tags": ["tag:weight-2"] },
        { "id": "3", "name": "c", "addresses": ["100.64.0.3", "fd7a:115c:a1e0::3"], "tags": ["tag:weight-5"] }
    ])
}

pub fn three_tags() -> Vec<String> {
    vec!["tag:weight-1".into(), "tag:weight-2".into(), "tag:weight-5".into()]
}

/// A reconciler wired to `mock` and a fresh cache.
pub fn reconciler_for(
    mock: &MockRegistry,
    node_ids: &[&str],
    skip_unchanged: bool,
) -> (Reconciler<RegistryClient>, Arc<SnapshotCache>) {
    let builder = TopologyBuilder::new(EnvoyConfig::default(), HealthCheckConfig::default());
    let statics = builder.build_static().unwrap();
    let cache = Arc::new(SnapshotCache::new());
    let client = RegistryClient::new(&mock.config()).unwrap();
    let settings = ReconcilerSettings {
        node_ids: node_ids.iter().map(|n| n.to_string()).collect(),
        tags: three_tags(),
        poll_interval: Duration::from_millis(50),
        fetch_timeout: Duration::from_millis(300),
        skip_unchanged,
    };
    (
        Reconciler::new(client, builder, statics, cache.clone(), settings),
        cache,
    )
}
