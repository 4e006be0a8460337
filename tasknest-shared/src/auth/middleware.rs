/// Request authentication (the request gate)
///
/// Every authenticated route runs through the same sequence before its
/// handler: extract the bearer token, verify it, resolve the encoded user
/// id against the user store (exactly one lookup per request), and attach
/// the resolved identity (password excluded) to the request.
///
/// The API server wires [`resolve_bearer_user`] into an Axum middleware
/// layer and inserts the returned [`CurrentUser`] into request extensions;
/// handlers receive it as an explicit `Extension<CurrentUser>` parameter.

use axum::http::{header, HeaderMap};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt;
use crate::models::user::{User, UserRole};

/// The authenticated identity attached to a request
///
/// A password-free projection of the user record resolved by the gate.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// User ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Account role
    pub role: UserRole,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Error type for request authentication
///
/// The three credential failures deliberately map to distinct messages so
/// clients can tell a missing header from a bad token from a stale token
/// whose user no longer exists.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable bearer token in the Authorization header
    #[error("Not authorized, no token provided")]
    MissingToken,

    /// Token failed signature or expiry verification
    #[error("Not authorized, token invalid")]
    InvalidToken,

    /// Token verified but the encoded user id resolves to nothing
    #[error("User not found")]
    UnknownUser,

    /// User store lookup failed
    #[error("Database error: {0}")]
    Database(String),
}

/// Extracts the bearer token from an Authorization header
///
/// Returns None when the header is absent, unreadable, or not a Bearer
/// scheme, all of which the gate reports as "no token provided".
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Authenticates a request: bearer token → verified claims → stored user
///
/// Performs exactly one user-store lookup. Any token verification failure
/// (bad signature, expiry, malformed token) collapses to
/// [`AuthError::InvalidToken`]; the reason is not leaked to the client.
///
/// # Errors
///
/// - [`AuthError::MissingToken`] when no bearer token is present
/// - [`AuthError::InvalidToken`] when verification fails
/// - [`AuthError::UnknownUser`] when the encoded id matches no user
/// - [`AuthError::Database`] when the lookup itself fails
pub async fn resolve_bearer_user(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<CurrentUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;

    let claims = jwt::validate_token(token, secret).map_err(|_| AuthError::InvalidToken)?;

    let user = User::find_by_id(pool, claims.sub)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(CurrentUser::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = headers_with_authorization("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with_authorization("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_token() {
        let headers = headers_with_authorization("Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_current_user_from_user_drops_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let current = CurrentUser::from(user.clone());
        assert_eq!(current.id, user.id);
        assert_eq!(current.name, "Ann");
        assert_eq!(current.email, "ann@example.com");
        assert_eq!(current.role, UserRole::User);
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::MissingToken.to_string(),
            "Not authorized, no token provided"
        );
        assert_eq!(
            AuthError::InvalidToken.to_string(),
            "Not authorized, token invalid"
        );
        assert_eq!(AuthError::UnknownUser.to_string(), "User not found");
    }
}
