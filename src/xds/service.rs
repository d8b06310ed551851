//! Discovery request handling against the snapshot cache.
//!
//! # Responsibilities
//! - Answer a discovery request from the node's latest snapshot
//! - Long-poll: hold a request whose version is current until a newer
//!   snapshot is published or the hold window closes
//!
//! A proxy's state is entirely in its request (`version_info`), so nothing
//! is kept per connection and one client's failure cannot affect another.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::cache::{Snapshot, SnapshotCache};
use crate::topology::ResourceType;
use crate::xds::types::{DiscoveryRequest, DiscoveryResponse};

/// Errors returned to a discovery client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("discovery request has no node id")]
    MissingNode,

    #[error("type_url '{got}' does not match endpoint type '{expected}'")]
    TypeMismatch { expected: &'static str, got: String },
}

impl DiscoveryError {
    pub fn status(&self) -> StatusCode {
        match self {
            DiscoveryError::MissingNode | DiscoveryError::TypeMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Serves discovery responses from a shared [`SnapshotCache`].
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    cache: Arc<SnapshotCache>,
    hold: Duration,
}

impl DiscoveryService {
    pub fn new(cache: Arc<SnapshotCache>, hold: Duration) -> Self {
        Self { cache, hold }
    }

    /// Configured long-poll window.
    pub fn hold(&self) -> Duration {
        self.hold
    }

    fn check<'a>(
        &self,
        request: &'a DiscoveryRequest,
        resource_type: ResourceType,
    ) -> Result<&'a str, DiscoveryError> {
        let node = request.node_id().ok_or(DiscoveryError::MissingNode)?;
        if !request.type_url.is_empty() && request.type_url != resource_type.type_url() {
            return Err(DiscoveryError::TypeMismatch {
                expected: resource_type.type_url(),
                got: request.type_url.clone(),
            });
        }
        if let Some(detail) = &request.error_detail {
            tracing::warn!(
                node = %node,
                resource_type = %resource_type,
                rejected_version = %request.version_info,
                nonce = %request.response_nonce,
                code = detail.code,
                message = %detail.message,
                "Proxy rejected configuration"
            );
        }
        Ok(node)
    }

    /// Answer immediately: `Some` when the node's latest snapshot differs from
    /// the version the proxy already has, `None` for "no update".
    pub fn respond(
        &self,
        request: &DiscoveryRequest,
        resource_type: ResourceType,
    ) -> Result<Option<DiscoveryResponse>, DiscoveryError> {
        let node = self.check(request, resource_type)?;
        Ok(self.lookup(node, request, resource_type))
    }

    /// Like [`respond`](Self::respond), but waits up to `hold` for a newer
    /// snapshot before answering "no update".
    pub async fn respond_or_wait(
        &self,
        request: &DiscoveryRequest,
        resource_type: ResourceType,
        hold: Duration,
    ) -> Result<Option<DiscoveryResponse>, DiscoveryError> {
        let node = self.check(request, resource_type)?;

        // Subscribe before the first lookup so a publish in between still wakes us.
        // Unknown nodes are not held; they would only ever time out.
        let Some(mut versions) = self.cache.subscribe(node) else {
            tracing::debug!(node = %node, "No snapshot for node");
            return Ok(None);
        };
        versions.borrow_and_update();
        if let Some(response) = self.lookup(node, request, resource_type) {
            return Ok(Some(response));
        }

        let deadline = Instant::now() + hold;
        loop {
            match time::timeout_at(deadline, versions.changed()).await {
                Ok(Ok(())) => {
                    versions.borrow_and_update();
                    if let Some(response) = self.lookup(node, request, resource_type) {
                        return Ok(Some(response));
                    }
                }
                Ok(Err(_)) | Err(_) => return Ok(None),
            }
        }
    }

    fn lookup(
        &self,
        node: &str,
        request: &DiscoveryRequest,
        resource_type: ResourceType,
    ) -> Option<DiscoveryResponse> {
        let snapshot = match self.cache.get(node) {
            Some(snapshot) => snapshot,
            None => {
                tracing::debug!(node = %node, "No snapshot for node yet");
                return None;
            }
        };
        if snapshot.version_info() == request.version_info {
            return None;
        }
        Some(build_response(&snapshot, request, resource_type))
    }
}

fn build_response(
    snapshot: &Snapshot,
    request: &DiscoveryRequest,
    resource_type: ResourceType,
) -> DiscoveryResponse {
    let resources = snapshot
        .resources(resource_type)
        .iter()
        .filter(|r| {
            request.resource_names.is_empty()
                || request.resource_names.iter().any(|name| name == r.name())
        })
        .cloned()
        .collect();

    DiscoveryResponse {
        version_info: snapshot.version_info(),
        resources,
        type_url: resource_type.type_url().to_string(),
        nonce: Uuid::new_v4().to_string(),
    }
}
