/// Database models for TaskNest
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and the public user view
/// - `task`: Per-user tasks with status/priority filtering

pub mod task;
pub mod user;
