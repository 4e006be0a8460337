/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. This module is the single
/// boundary that converts typed domain failures into the uniform response
/// envelope `{"success": false, "message": "..."}` with the right HTTP
/// status. Store and internal exception detail never reaches the client;
/// it is logged server-side instead.
///
/// One deliberate deviation from convention: a duplicate email maps to 400,
/// not 409. That is the observable contract of this API and both the
/// signup pre-check and the unique-index backstop go through it.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use tasknest_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400): validation failures, malformed ids and bodies
    BadRequest(String),

    /// Conflict (400): duplicate email
    Conflict(String),

    /// Unauthorized (401): gate failures and credential mismatches
    Unauthorized(String),

    /// Forbidden (403): authenticated but not allowed
    Forbidden(String),

    /// Not found (404): missing resource or route
    NotFound(String),

    /// Internal server error (500)
    Internal(String),
}

/// Error response envelope
///
/// Every failure, from a missing field to a database outage, serializes to
/// this exact shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                // Log the detail, return a generic message
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong!".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Unique-index backstop for concurrent email writes; the
                // handler-level pre-checks produce the specific messages on
                // the common path.
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already in use".to_string());
                    }
                }

                ApiError::Internal(format!("Database error: {}", db_err))
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert request-gate errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::UnknownUser => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convert password errors to API errors
///
/// Hashing/verification failures are operational, never a client mistake.
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

/// Convert token errors to API errors
///
/// Handlers only mint tokens (verification happens in the gate), so a
/// token error here is an internal signing failure.
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Internal(format!("Token operation failed: {}", err))
    }
}

/// JSON body extractor whose rejection is enveloped
///
/// Axum's plain `Json` rejects malformed bodies with a bare text response;
/// this wrapper routes the rejection through [`ApiError`] so even a syntax
/// error in the request body comes back as `{"success": false, ...}`.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn envelope_of(err: ApiError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let envelope: ErrorResponse = serde_json::from_slice(&bytes).expect("envelope json");
        (status, envelope)
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (status, _) = envelope_of(ApiError::BadRequest("x".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = envelope_of(ApiError::Unauthorized("x".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = envelope_of(ApiError::Forbidden("x".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = envelope_of(ApiError::NotFound("x".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = envelope_of(ApiError::Internal("x".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_conflict_maps_to_400() {
        let err = ApiError::Conflict("User already exists with this email".into());
        let (status, envelope) = envelope_of(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!envelope.success);
        assert_eq!(envelope.message, "User already exists with this email");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = ApiError::Internal("connection refused on 10.0.0.3:5432".into());
        let (_, envelope) = envelope_of(err).await;

        assert_eq!(envelope.message, "Something went wrong!");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_gate_errors_keep_their_messages() {
        let err = ApiError::from(AuthError::MissingToken);
        match err {
            ApiError::Unauthorized(msg) => {
                assert_eq!(msg, "Not authorized, no token provided")
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }

        let err = ApiError::from(AuthError::UnknownUser);
        match err {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "User not found"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }
}
