//! The error surface of the HTTP API
//!
//! Everything a handler can intentionally fail with lives in
//! [ApiError]; anything unexpected is carried as an opaque
//! [Report] and surfaces as a 500.

use axum::{http::StatusCode, response::IntoResponse, Json};
use color_eyre::Report;
use serde::Serialize;
use tracing::error;

impl From<Report> for ApiError {
    fn from(value: Report) -> Self {
        ApiError::UnknownError(value)
    }
}

/// All errors the API intentionally answers with
#[allow(clippy::missing_docs_in_private_items)]
pub(crate) enum ApiError {
    /// Registration (or a username change) hit an existing
    /// username/email
    UserAlreadyExists,
    /// The store rejected the new record
    InvalidUserData,
    /// Unknown email or wrong password - deliberately one variant,
    /// the client must not learn which of the two it was
    WrongCredentials,
    UserNotFound,
    /// No usable `Authorization: Bearer` header on a guarded route
    NotLoggedIn,
    /// The presented token is expired or not ours
    InvalidToken,
    /// The auth header was not even readable as a string
    MisformedAuth(Report),
    /// Guarded route requires an admin account
    AdminOnly,
    UnknownError(Report),
}

#[derive(Serialize)]
struct ErrorReturn {
    reason: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, reason) = match self {
            ApiError::UserAlreadyExists => {
                (StatusCode::BAD_REQUEST, "User already exists".to_owned())
            }
            ApiError::InvalidUserData => (StatusCode::BAD_REQUEST, "Invalid user data".to_owned()),
            ApiError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_owned(),
            ),
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
            ApiError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "Not logged in".to_owned()),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid/expired token".to_owned(),
            ),
            ApiError::MisformedAuth(r) => (
                StatusCode::UNAUTHORIZED,
                format!("Misformed authorization header: {r}"),
            ),
            ApiError::AdminOnly => (StatusCode::FORBIDDEN, "Admin access required".to_owned()),
            ApiError::UnknownError(r) => {
                let error = format!("{r:?}");

                error!("Error: {error}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal Server Error: {error}"),
                )
                    .into_response();
            }
        };

        (status, Json(ErrorReturn { reason })).into_response()
    }
}
