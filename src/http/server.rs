//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the axum Router: discovery endpoints plus the optional admin API
//! - Wire up middleware (tracing, request timeout)
//! - Serve plain TCP or TLS until the shutdown signal, then drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::cache::SnapshotCache;
use crate::config::AdminConfig;
use crate::observability::metrics;
use crate::reconciler::ReconcilerStats;
use crate::topology::ResourceType;
use crate::xds::{DiscoveryError, DiscoveryRequest, DiscoveryService};

/// Grace period for in-flight long-polls once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub discovery: DiscoveryService,
    pub cache: Arc<SnapshotCache>,
    pub reconciler: Arc<ReconcilerStats>,
    pub admin: AdminConfig,
}

/// HTTP server for the discovery API.
pub struct DiscoveryServer {
    router: Router,
}

impl DiscoveryServer {
    pub fn new(state: AppState, request_timeout: Duration) -> Self {
        let router = Self::build_router(state, request_timeout);
        Self { router }
    }

    /// The fully layered router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        let mut router = Router::new();
        for resource_type in ResourceType::ALL {
            let path = format!("/v3/discovery:{}", resource_type.rest_segment());
            router = router.route(
                &path,
                post(move |State(state): State<AppState>, Json(request): Json<DiscoveryRequest>| {
                    discovery_handler(state, resource_type, request)
                }),
            );
        }

        if state.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Discovery server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Discovery server stopped");
        Ok(())
    }

    /// Serve TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, "Discovery server starting (TLS)");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("Discovery server stopped");
        Ok(())
    }
}

async fn discovery_handler(
    state: AppState,
    resource_type: ResourceType,
    request: DiscoveryRequest,
) -> Response {
    let hold = state.discovery.hold();
    let result: Result<_, DiscoveryError> = state
        .discovery
        .respond_or_wait(&request, resource_type, hold)
        .await;

    let response = match result {
        Ok(Some(response)) => {
            tracing::debug!(
                node = request.node_id().unwrap_or_default(),
                resource_type = %resource_type,
                version = %response.version_info,
                resources = response.resources.len(),
                "Discovery response sent"
            );
            Json(response).into_response()
        }
        Ok(None) => StatusCode::NOT_MODIFIED.into_response(),
        Err(e) => {
            tracing::warn!(resource_type = %resource_type, error = %e, "Rejected discovery request");
            e.into_response()
        }
    };

    metrics::record_discovery_request(resource_type.rest_segment(), response.status().as_u16());
    response
}
