pub mod health;

use axum::http::Uri;

use crate::error::AppError;

/// Fallback for every unmatched path.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("no route for {}", uri.path()))
}
