//! HTTP mapping for `LivePolicyError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, warn};

use livepolicy_core::error::{ClientCode, LivePolicyError};

/// Handler error: renders a plain-text body with the mapped status.
#[derive(Debug)]
pub struct ApiError(pub LivePolicyError);

impl From<LivePolicyError> for ApiError {
    fn from(e: LivePolicyError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest | ClientCode::Config => StatusCode::BAD_REQUEST,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::StartFailed
        | ClientCode::EvalFailed
        | ClientCode::UnexpectedResult
        | ClientCode::StopFailed
        | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_for(code);

        if self.0.is_expected() {
            debug!(code = code.as_str(), error = %self.0, "request failed");
        } else if status.is_server_error() {
            error!(code = code.as_str(), error = %self.0, "request failed");
        } else {
            warn!(code = code.as_str(), error = %self.0, "request rejected");
        }

        (status, self.0.to_string()).into_response()
    }
}
