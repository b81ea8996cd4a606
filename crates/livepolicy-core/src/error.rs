//! Shared error type across livepolicy crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / missing form field.
    BadRequest,
    /// Tenant configuration rejected.
    Config,
    /// Engine could not be started.
    StartFailed,
    /// Tenant reference unknown.
    NotFound,
    /// Engine failed to evaluate a decision.
    EvalFailed,
    /// Decision result had an unexpected shape.
    UnexpectedResult,
    /// Engine did not stop cleanly.
    StopFailed,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Config => "CONFIG",
            ClientCode::StartFailed => "START_FAILED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::EvalFailed => "EVAL_FAILED",
            ClientCode::UnexpectedResult => "UNEXPECTED_RESULT",
            ClientCode::StopFailed => "STOP_FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LivePolicyError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum LivePolicyError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid tenant config: {0}")]
    Config(String),
    #[error("engine start failed: {0}")]
    Start(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("evaluation failed: {0}")]
    Eval(String),
    #[error("unexpected decision result: {0}")]
    Shape(String),
    #[error("engine stop failed: {0}")]
    Stop(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LivePolicyError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            LivePolicyError::BadRequest(_) => ClientCode::BadRequest,
            LivePolicyError::Config(_) => ClientCode::Config,
            LivePolicyError::Start(_) => ClientCode::StartFailed,
            LivePolicyError::NotFound(_) => ClientCode::NotFound,
            LivePolicyError::Eval(_) => ClientCode::EvalFailed,
            LivePolicyError::Shape(_) => ClientCode::UnexpectedResult,
            LivePolicyError::Stop(_) => ClientCode::StopFailed,
            LivePolicyError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Expected outcomes that should not be logged as errors.
    pub fn is_expected(&self) -> bool {
        matches!(self, LivePolicyError::NotFound(_) | LivePolicyError::Stop(_))
    }
}
