/// Profile endpoints
///
/// # Endpoints
///
/// - `GET /me` - Fetch the caller's profile (includes `createdAt`)
/// - `PUT /me` - Partial profile update (name and/or email)
///
/// Both run behind the request gate; the resolved identity arrives as an
/// `Extension<CurrentUser>` parameter.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tasknest_shared::{
    auth::middleware::CurrentUser,
    models::user::{PublicUser, UpdateUser, User},
};
use validator::ValidateEmail;

/// Profile update request
///
/// Both fields are optional: absent fields are left untouched. An empty
/// string is treated the same as absent.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name
    pub name: Option<String>,

    /// New email address
    pub email: Option<String>,
}

/// Validated profile update input
#[derive(Debug, Default)]
struct UpdateProfileData {
    name: Option<String>,
    email: Option<String>,
}

impl UpdateProfileRequest {
    fn validate(self) -> Result<UpdateProfileData, ApiError> {
        let name = match self.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.chars().count() > 50 {
                    return Err(ApiError::BadRequest(
                        "Name cannot exceed 50 characters".to_string(),
                    ));
                }
                // Empty after trimming: nothing to apply
                (!name.is_empty()).then_some(name)
            }
            None => None,
        };

        let email = match self.email {
            Some(email) => {
                let email = email.trim().to_string();
                if email.is_empty() {
                    None
                } else if !email.validate_email() {
                    return Err(ApiError::BadRequest(
                        "Please enter a valid email".to_string(),
                    ));
                } else {
                    Some(email.to_lowercase())
                }
            }
            None => None,
        };

        Ok(UpdateProfileData { name, email })
    }
}

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Envelope flag
    pub success: bool,

    /// Envelope message
    pub message: String,

    /// Public view of the account
    pub user: PublicUser,
}

/// Fetch the caller's profile
///
/// Re-fetches the account by id so the response reflects the stored record,
/// and adds `createdAt` to the public view.
///
/// # Endpoint
///
/// ```text
/// GET /me
/// Authorization: Bearer <token>
/// ```
pub async fn get_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile retrieved successfully".to_string(),
        user: PublicUser::with_created_at(&user),
    }))
}

/// Update the caller's profile
///
/// Applies only the provided fields. A new email that already belongs to a
/// different account is rejected; keeping your own email is not a
/// conflict.
///
/// # Endpoint
///
/// ```text
/// PUT /me
/// Authorization: Bearer <token>
///
/// {"name": "Ann B", "email": "ann.b@example.com"}
/// ```
///
/// # Errors
///
/// - `400`: Validation failed, or email already in use by another account
/// - `500`: Server error
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let data = req.validate()?;

    if let Some(ref email) = data.email {
        // Check if email is already taken by another user
        if User::email_taken_by_other(&state.db, email, current.id).await? {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let user = User::update(
        &state.db,
        current.id,
        UpdateUser {
            name: data.name,
            email: data.email,
            password_hash: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
        user: PublicUser::from_user(&user),
    }))
}
