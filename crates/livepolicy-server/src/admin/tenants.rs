use axum::{
    extract::{Path, State},
    response::Redirect,
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use livepolicy_core::error::LivePolicyError;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::registry::TenantInfo;

/// Form posted to `/opas`. `_method=DELETE` turns it into a delete.
#[derive(Debug, Default, Deserialize)]
pub struct TenantForm {
    #[serde(rename = "ref")]
    pub tenant_ref: Option<String>,
    pub system_id: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LivePolicyError::BadRequest(format!("{field} must be provided")).into())
}

pub async fn list_tenants(State(app): State<AppState>) -> Json<Value> {
    let tenants = app.registry().list().await;
    Json(json!({ "tenants": tenants }))
}

pub async fn submit_tenant_form(
    State(app): State<AppState>,
    Form(form): Form<TenantForm>,
) -> Result<Redirect, ApiError> {
    let tenant_ref = required(form.tenant_ref, "ref")?;

    if form.method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("DELETE")) {
        app.registry().delete(&tenant_ref).await;
        return Ok(Redirect::to("/opas"));
    }

    let system_id = required(form.system_id, "system_id")?;
    let token = required(form.token, "token")?;
    let endpoint = required(form.endpoint, "endpoint")?;

    app.registry()
        .add(&tenant_ref, &system_id, &token, &endpoint)
        .await?;

    Ok(Redirect::to(&format!("/opas/{tenant_ref}")))
}

pub async fn show_tenant(
    State(app): State<AppState>,
    Path(tenant_ref): Path<String>,
) -> Result<Json<TenantInfo>, ApiError> {
    app.registry()
        .tenant(&tenant_ref)
        .await
        .map(Json)
        .ok_or_else(|| LivePolicyError::NotFound(format!("tenant {tenant_ref}")).into())
}
