//! Axum router wiring.
//!
//! Exposes the operational endpoints. Every routed request passes the
//! tracking middleware, scrapes included.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), obs::track::track_requests))
        .with_state(state)
}
