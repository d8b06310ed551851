use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::cache::Snapshot;
use crate::http::server::AppState;
use crate::reconciler::ReconcilerStatus;
use crate::topology::EndpointAssignment;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub nodes: usize,
}

#[derive(Serialize)]
pub struct NodeSnapshot {
    pub node: String,
    pub snapshot: Snapshot,
    pub assignment: EndpointAssignment,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        nodes: state.cache.len(),
    })
}

/// Node id → latest published version.
pub async fn get_snapshots(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.cache.nodes().into_iter().collect())
}

pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<NodeSnapshot>, StatusCode> {
    let snapshot = state.cache.get(&node).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(NodeSnapshot {
        node,
        assignment: snapshot.assignment().clone(),
        snapshot: snapshot.as_ref().clone(),
    }))
}

pub async fn get_reconciler(State(state): State<AppState>) -> Json<ReconcilerStatus> {
    Json(state.reconciler.status())
}
