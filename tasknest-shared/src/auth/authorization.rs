/// Authorization checks
///
/// TaskNest's permission model is deliberately small: a resource is
/// readable and writable by its owner and nobody else, and a secondary
/// admin-only gate exists for routes that require the `admin` role. The
/// admin gate is an available capability; no route in the current surface
/// mounts it.

use uuid::Uuid;

use super::middleware::CurrentUser;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Authenticated user does not own the resource
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Authenticated user is not an admin
    #[error("Access denied. Admin only.")]
    AdminOnly,
}

/// Checks that the authenticated user owns a resource
///
/// # Example
///
/// ```
/// use tasknest_shared::auth::authorization::require_owner;
/// use tasknest_shared::auth::middleware::CurrentUser;
/// use tasknest_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let user = CurrentUser {
///     id: Uuid::new_v4(),
///     name: "Ann".to_string(),
///     email: "ann@example.com".to_string(),
///     role: UserRole::User,
/// };
///
/// assert!(require_owner(&user, user.id).is_ok());
/// assert!(require_owner(&user, Uuid::new_v4()).is_err());
/// ```
pub fn require_owner(user: &CurrentUser, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if user.id != resource_owner_id {
        return Err(AuthzError::NotOwner);
    }

    Ok(())
}

/// Checks that the authenticated user has the admin role
pub fn require_admin(user: &CurrentUser) -> Result<(), AuthzError> {
    if !user.role.is_admin() {
        return Err(AuthzError::AdminOnly);
    }

    Ok(())
}
