//! # TaskNest Shared Library
//!
//! This crate contains the types and business logic shared by the TaskNest
//! API server: database models, authentication primitives, and the database
//! layer.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, tasks)
//! - `auth`: Password hashing, identity tokens, request authentication
//! - `db`: Connection pooling and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the TaskNest shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
