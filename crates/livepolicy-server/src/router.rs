//! Axum router wiring.

use axum::{response::Redirect, routing::get, Router};

use crate::{admin, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/opas") }))
        .route("/opas", get(admin::list_tenants).post(admin::submit_tenant_form))
        .route("/opas/:tenant_ref", get(admin::show_tenant))
        .route("/demo/:tenant_ref", get(admin::demo_decision))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
