/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, password change
/// - `me`: Profile fetch and update
/// - `tasks`: Per-user task CRUD
///
/// Every handler speaks the uniform envelope: success responses carry
/// `{"success": true, "message": "...", ...}` and failures are converted by
/// [`crate::error::ApiError`] into `{"success": false, "message": "..."}`.

use serde::Serialize;

pub mod auth;
pub mod health;
pub mod me;
pub mod tasks;

/// Envelope for operations that return no payload beyond the outcome
/// (password change, task deletion)
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always true on the success path
    pub success: bool,

    /// Outcome description
    pub message: String,
}
