//! Unified error handling for the ECommerce API surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Build-time contract violations.
///
/// Any of these aborts the whole build: a half-assembled surface is never
/// returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Scope '{0}' is not declared by any realm resource server")]
    UndeclaredScope(String),

    #[error("Scope '{0}' must have the form '<resource-server>/<scope>'")]
    MalformedScope(String),

    #[error("Scope '{scope}' belongs to realm '{realm}' which is not attached to authorizer '{authorizer}'")]
    ScopeOutsideAuthorizer {
        scope: String,
        realm: String,
        authorizer: String,
    },

    #[error("Method {verb} {path} is bound more than once")]
    DuplicateMethod { verb: String, path: String },

    #[error("Authorizer '{0}' must reference at least one realm")]
    EmptyAuthorizer(String),

    #[error("Authorizer '{0}' is declared more than once")]
    DuplicateAuthorizer(String),

    #[error("Authorizer '{0}' requires at least one allowed scope")]
    MissingScopes(String),

    #[error("Invalid path segment '{0}'")]
    InvalidSegment(String),

    #[error("Path parameter '{new}' conflicts with sibling parameter '{existing}' under {parent}")]
    ConflictingPathParameter {
        parent: String,
        existing: String,
        new: String,
    },

    #[error("Unknown resource handle {0}")]
    UnknownResource(usize),

    #[error("Unknown authorizer handle {0}")]
    UnknownAuthorizer(usize),

    #[error("Unknown validator handle {0}")]
    UnknownValidator(usize),

    #[error("Invalid schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Client '{client}' of realm '{realm}' requests scope '{scope}' outside its own resource server")]
    InvalidClientScope {
        realm: String,
        client: String,
        scope: String,
    },

    #[error("Resource server identifier '{0}' is bound to more than one realm")]
    DuplicateResourceServer(String),

    #[error("Handler target '{0}' is not resolved")]
    UnresolvedHandler(String),

    #[error("Stack dependency cycle involving '{0}'")]
    DependencyCycle(String),

    #[error("Unknown stack '{0}'")]
    UnknownStack(String),
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication denied: {0}")]
    HookDenied(String),

    #[error("Self sign-up is disabled for realm '{0}'")]
    SignUpDisabled(String),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::MethodNotAllowed(msg) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::HookDenied(msg) => (StatusCode::FORBIDDEN, "hook_denied", msg.clone()),
            AppError::SignUpDisabled(realm) => (
                StatusCode::FORBIDDEN,
                "sign_up_disabled",
                format!("Self sign-up is disabled for realm '{}'", realm),
            ),
            AppError::Build(e) => {
                tracing::error!("Build error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "build_error",
                    "The API surface is misconfigured".to_string(),
                )
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "jwt_error",
                    "Invalid or expired token".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}
