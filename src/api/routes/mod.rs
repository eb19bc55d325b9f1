//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod index;
pub mod query;
pub mod suggest;

use crate::api::error::ApiError;
use axum::http::Uri;

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
