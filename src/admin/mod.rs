//! Read-only admin API, mounted on the discovery listener when enabled.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/snapshots", get(get_snapshots))
        .route("/admin/snapshots/{node}", get(get_snapshot))
        .route("/admin/reconciler", get(get_reconciler))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
