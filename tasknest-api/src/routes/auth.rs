/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/signup` - Register a new account (public)
/// - `POST /auth/login` - Log in and get an identity token (public)
/// - `PUT /auth/password` - Change password (authenticated)
///
/// Request bodies are validated field by field before any store access; the
/// first violated rule short-circuits with a 400 and that rule's message.
/// Login failures use one message for both unknown email and wrong
/// password so the response never reveals which factor failed.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
    routes::StatusResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tasknest_shared::{
    auth::{jwt, middleware::CurrentUser, password},
    models::user::{CreateUser, PublicUser, UpdateUser, User},
};
use validator::ValidateEmail;

/// Signup request
///
/// Fields are optional at the serde layer so that a missing field produces
/// the validator's "... is required" message instead of a decoder error.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Display name
    pub name: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Plaintext password (hashed before it is ever persisted)
    pub password: Option<String>,
}

/// Validated signup input
#[derive(Debug)]
struct SignupData {
    name: String,
    email: String,
    password: String,
}

impl SignupRequest {
    /// Validates field presence, lengths, and email syntax, in rule order
    fn validate(self) -> Result<SignupData, ApiError> {
        let name = self
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;

        if name.chars().count() > 50 {
            return Err(ApiError::BadRequest(
                "Name cannot exceed 50 characters".to_string(),
            ));
        }

        let email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

        if !email.validate_email() {
            return Err(ApiError::BadRequest(
                "Please enter a valid email".to_string(),
            ));
        }

        let password = self
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

        if password.chars().count() < 6 {
            return Err(ApiError::BadRequest(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        Ok(SignupData {
            name,
            email: email.to_lowercase(),
            password,
        })
    }
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: Option<String>,

    /// Plaintext password
    pub password: Option<String>,
}

/// Validated login input
#[derive(Debug)]
struct LoginData {
    email: String,
    password: String,
}

impl LoginRequest {
    fn validate(self) -> Result<LoginData, ApiError> {
        let email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

        if !email.validate_email() {
            return Err(ApiError::BadRequest(
                "Please enter a valid email".to_string(),
            ));
        }

        let password = self
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

        Ok(LoginData {
            email: email.to_lowercase(),
            password,
        })
    }
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// The caller's current password
    pub current_password: Option<String>,

    /// The replacement password
    pub new_password: Option<String>,
}

/// Validated password change input
#[derive(Debug)]
struct ChangePasswordData {
    current_password: String,
    new_password: String,
}

impl ChangePasswordRequest {
    fn validate(self) -> Result<ChangePasswordData, ApiError> {
        let current_password = self
            .current_password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Current password is required".to_string()))?;

        let new_password = self
            .new_password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ApiError::BadRequest("New password is required".to_string()))?;

        if new_password.chars().count() < 6 {
            return Err(ApiError::BadRequest(
                "New password must be at least 6 characters".to_string(),
            ));
        }

        Ok(ChangePasswordData {
            current_password,
            new_password,
        })
    }
}

/// Response for signup and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Envelope flag
    pub success: bool,

    /// Envelope message
    pub message: String,

    /// Signed identity token
    pub token: String,

    /// Public view of the account
    pub user: PublicUser,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/signup
/// Content-Type: application/json
///
/// {"name": "Ann", "email": "ann@example.com", "password": "secret1"}
/// ```
///
/// # Errors
///
/// - `400`: Validation failed, or email already registered
/// - `500`: Server error
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let data = req.validate()?;

    // Check if user already exists
    if User::find_by_email(&state.db, &data.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let password_hash = password::hash_password(&data.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: data.name,
            email: data.email,
            password_hash,
        },
    )
    .await?;

    let claims = jwt::Claims::new(user.id, state.token_ttl());
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "New user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            token,
            user: PublicUser::from_user(&user),
        }),
    ))
}

/// Log a user in
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {"email": "ann@example.com", "password": "secret1"}
/// ```
///
/// # Errors
///
/// - `400`: Validation failed
/// - `401`: Invalid credentials (same message for unknown email and wrong
///   password)
/// - `500`: Server error
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let data = req.validate()?;

    let user = User::find_by_email(&state.db, &data.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify_password(&data.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let claims = jwt::Claims::new(user.id, state.token_ttl());
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: PublicUser::from_user(&user),
    }))
}

/// Change the caller's password
///
/// Verifies the current password against the stored hash, then stores the
/// hash of the new one. The new password is always hashed exactly once:
/// never skipped and never applied to an already-hashed value.
///
/// # Endpoint
///
/// ```text
/// PUT /auth/password
/// Authorization: Bearer <token>
///
/// {"currentPassword": "secret1", "newPassword": "secret2"}
/// ```
///
/// # Errors
///
/// - `400`: Validation failed
/// - `401`: Current password is incorrect
/// - `500`: Server error
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let data = req.validate()?;

    // Re-fetch including the stored hash; the gate's view excludes it
    let user = User::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = password::verify_password(&data.current_password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = password::hash_password(&data.new_password)?;

    User::update(
        &state.db,
        user.id,
        UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Password updated successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validation_rule_order() {
        // Missing name fails first even when everything else is bad too
        let req = SignupRequest {
            name: None,
            email: Some("nonsense".to_string()),
            password: Some("x".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Name is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_name_length() {
        let req = SignupRequest {
            name: Some("x".repeat(51)),
            email: Some("ann@example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => {
                assert_eq!(msg, "Name cannot exceed 50 characters")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_whitespace_name_counts_as_missing() {
        let req = SignupRequest {
            name: Some("   ".to_string()),
            email: Some("ann@example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Name is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_email_syntax() {
        let req = SignupRequest {
            name: Some("Ann".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("secret1".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Please enter a valid email"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_password_length() {
        let req = SignupRequest {
            name: Some("Ann".to_string()),
            email: Some("ann@example.com".to_string()),
            password: Some("five5".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => {
                assert_eq!(msg, "Password must be at least 6 characters")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_normalizes_email_and_trims() {
        let req = SignupRequest {
            name: Some("  Ann  ".to_string()),
            email: Some("  Ann@Example.COM ".to_string()),
            password: Some("secret1".to_string()),
        };
        let data = req.validate().expect("should validate");
        assert_eq!(data.name, "Ann");
        assert_eq!(data.email, "ann@example.com");
        assert_eq!(data.password, "secret1");
    }

    #[test]
    fn test_login_validation() {
        let req = LoginRequest {
            email: None,
            password: Some("secret1".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Email is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }

        let req = LoginRequest {
            email: Some("ann@example.com".to_string()),
            password: None,
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Password is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_login_password_has_no_length_rule() {
        // Login only requires presence; length rules apply at signup
        let req = LoginRequest {
            email: Some("ann@example.com".to_string()),
            password: Some("x".to_string()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_change_password_validation() {
        let req = ChangePasswordRequest {
            current_password: None,
            new_password: Some("secret2".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Current password is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }

        let req = ChangePasswordRequest {
            current_password: Some("secret1".to_string()),
            new_password: Some("short".to_string()),
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => {
                assert_eq!(msg, "New password must be at least 6 characters")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_change_password_accepts_camel_case_body() {
        let req: ChangePasswordRequest = serde_json::from_str(
            r#"{"currentPassword": "secret1", "newPassword": "secret2"}"#,
        )
        .expect("deserialize");

        let data = req.validate().expect("should validate");
        assert_eq!(data.current_password, "secret1");
        assert_eq!(data.new_password, "secret2");
    }
}
