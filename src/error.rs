use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// StoreError
///
/// Failures raised by a `Repository` implementation. Callers never see the
/// underlying detail; it is logged and mapped to a 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A module type name that cannot be used as a table identifier.
    #[error("invalid module table name: {0}")]
    InvalidTable(String),
}

/// ListingError
///
/// Hard failures of the resource listing request. Each variant aborts the request
/// before any part of the table is produced.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Missing or malformed course id.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("course not found: {0}")]
    NotFound(i64),

    /// The caller is not allowed into the course.
    #[error("access denied to course {0}")]
    AccessDenied(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ListingError {
    pub fn status(&self) -> StatusCode {
        match self {
            ListingError::Validation(_) => StatusCode::BAD_REQUEST,
            ListingError::NotFound(_) => StatusCode::NOT_FOUND,
            ListingError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ListingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ListingError::Store(e) => {
                tracing::error!(error = %e, "resource listing store failure");
                "An internal error occurred".to_string()
            }
            other => {
                tracing::info!(error = %other, status = status.as_u16(), "resource listing rejected");
                other.to_string()
            }
        };
        let body = format!(
            "<!DOCTYPE html><html><body><div class=\"errorbox\"><p>{}</p></div></body></html>",
            crate::formatter::escape_html(&message)
        );
        (status, Html(body)).into_response()
    }
}
