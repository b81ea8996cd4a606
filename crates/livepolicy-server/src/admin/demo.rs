use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::ApiError;

/// Decision evaluated by the demo page.
pub const DEMO_DECISION_PATH: &str = "/policy/allow";
/// Subject used when the query omits `name`.
pub const DEFAULT_SUBJECT: &str = "alice";

#[derive(Debug, Default, Deserialize)]
pub struct DemoQuery {
    pub name: Option<String>,
}

/// `GET /demo/{ref}?name=...` -> `{"tenant", "name", "allowed"}`.
pub async fn demo_decision(
    State(app): State<AppState>,
    Path(tenant_ref): Path<String>,
    Query(q): Query<DemoQuery>,
) -> Result<Json<Value>, ApiError> {
    let name = q
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    let allowed = app
        .decisions()
        .decide_bool(&tenant_ref, DEMO_DECISION_PATH, &json!({ "name": name }))
        .await?;

    Ok(Json(json!({
        "tenant": tenant_ref,
        "name": name,
        "allowed": allowed,
    })))
}
