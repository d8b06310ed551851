//! Discovery and admin endpoints, driven through the router and over TCP.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use weighted_eds::cache::{Snapshot, SnapshotCache};
use weighted_eds::config::{AdminConfig, EnvoyConfig, HealthCheckConfig};
use weighted_eds::http::{AppState, DiscoveryServer};
use weighted_eds::lifecycle::Shutdown;
use weighted_eds::reconciler::ReconcilerStats;
use weighted_eds::topology::{EndpointAssignment, Locality, ResourceType, TopologyBuilder};
use weighted_eds::xds::{DiscoveryResponse, DiscoveryService};

const ADMIN_KEY: &str = "admin-test-key";

fn snapshot(version: u64, weight: u32) -> Snapshot {
    let builder = TopologyBuilder::new(EnvoyConfig::default(), HealthCheckConfig::default());
    let statics = builder.build_static().unwrap();
    let assignment = EndpointAssignment {
        cluster_name: "envoy-cluster".into(),
        localities: vec![Locality {
            tag: "tag:weight-3".into(),
            weight,
            addresses: vec!["100.64.0.3".parse().unwrap()],
        }],
    };
    Snapshot::new(version, &statics, assignment, 8080).unwrap()
}

fn server(cache: Arc<SnapshotCache>, hold: Duration, admin_enabled: bool) -> DiscoveryServer {
    let state = AppState {
        discovery: DiscoveryService::new(cache.clone(), hold),
        cache,
        reconciler: Arc::new(ReconcilerStats::new()),
        admin: AdminConfig {
            enabled: admin_enabled,
            api_key: ADMIN_KEY.into(),
        },
    };
    DiscoveryServer::new(state, Duration::from_secs(60))
}

fn discovery_request(segment: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("/v3/discovery:{}", segment))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_each_type_served() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(1, 3)).unwrap();
    let router = server(cache, Duration::from_millis(50), false).router();

    for resource_type in ResourceType::ALL {
        let (status, body) = send(
            router.clone(),
            discovery_request(
                resource_type.rest_segment(),
                json!({ "node": { "id": "envoy-node" }, "type_url": resource_type.type_url() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", resource_type);

        let response: DiscoveryResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(response.version_info, "1");
        assert_eq!(response.type_url, resource_type.type_url());
        assert_eq!(response.resources.len(), 1);
        assert_eq!(response.resources[0].resource_type(), resource_type);
        assert_eq!(body["resources"][0]["@type"], resource_type.type_url());
    }
}

#[tokio::test]
async fn test_endpoint_payload() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(7, 3)).unwrap();
    let router = server(cache, Duration::from_millis(50), false).router();

    let (status, body) = send(
        router,
        discovery_request("endpoints", json!({ "node": { "id": "envoy-node" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version_info"], "7");

    let locality = &body["resources"][0]["endpoints"][0];
    assert_eq!(locality["locality"]["region"], "tag:weight-3");
    assert_eq!(locality["load_balancing_weight"], 3);
    assert_eq!(locality["priority"], 0);
}

#[tokio::test]
async fn test_up_to_date_proxy_gets_not_modified() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(2, 1)).unwrap();
    let router = server(cache, Duration::from_millis(50), false).router();

    let (status, body) = send(
        router,
        discovery_request(
            "clusters",
            json!({ "version_info": "2", "node": { "id": "envoy-node" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_bad_requests_rejected() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(1, 1)).unwrap();
    let router = server(cache, Duration::from_millis(50), false).router();

    let (status, body) = send(router.clone(), discovery_request("listeners", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("node"));

    let (status, _) = send(
        router.clone(),
        discovery_request(
            "listeners",
            json!({ "node": { "id": "envoy-node" }, "type_url": ResourceType::Route.type_url() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        router,
        discovery_request("secrets", json!({ "node": { "id": "envoy-node" } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_long_poll_released_by_publish() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(1, 1)).unwrap();
    let router = server(cache.clone(), Duration::from_secs(10), false).router();

    let writer = cache.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.publish("envoy-node", snapshot(2, 4)).unwrap();
    });

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        send(
            router,
            discovery_request(
                "endpoints",
                json!({ "version_info": "1", "node": { "id": "envoy-node" } }),
            ),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version_info"], "2");
    assert_eq!(body["resources"][0]["endpoints"][0]["load_balancing_weight"], 4);
}

#[tokio::test]
async fn test_admin_requires_key() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(5, 1)).unwrap();
    let router = server(cache, Duration::from_millis(50), true).router();

    let unauthenticated = Request::get("/admin/snapshots").body(Body::empty()).unwrap();
    let (status, _) = send(router.clone(), unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/admin/snapshots")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized = Request::get("/admin/snapshots")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router.clone(), authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "envoy-node": 5 }));

    let detail = Request::get("/admin/snapshots/envoy-node")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router.clone(), detail).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["version"], 5);
    assert_eq!(body["assignment"]["localities"][0]["weight"], 1);

    let missing = Request::get("/admin/snapshots/nobody")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router.clone(), missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let reconciler = Request::get("/admin/reconciler")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router, reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["ticks"], 0);
}

#[tokio::test]
async fn test_admin_disabled_by_default() {
    let cache = Arc::new(SnapshotCache::new());
    let router = server(cache, Duration::from_millis(50), false).router();

    let request = Request::get("/admin/status")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_served_over_tcp_and_drains_on_shutdown() {
    let cache = Arc::new(SnapshotCache::new());
    cache.publish("envoy-node", snapshot(1, 2)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(
        server(cache, Duration::from_millis(100), false).run(listener, shutdown.subscribe()),
    );

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/v3/discovery:clusters", addr))
        .json(&json!({ "node": { "id": "envoy-node", "cluster": "edge" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: DiscoveryResponse = response.json().await.unwrap();
    assert_eq!(body.resources[0].name(), "envoy-cluster");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
