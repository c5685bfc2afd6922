use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{create_user, CreateUserError, UserCreation},
    error_handling::ApiError,
    types::EMail,
};

/// What a fresh registration answers with
///
/// Deliberately less than the full profile - the client just logged
/// nobody in yet.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Serialize)]
struct RegisteredUser {
    id: Uuid,
    name: String,
    email: EMail,
    username: String,
}

/// Creates a new account
///
/// A taken username or email answers 400 without revealing which of
/// the two collided. Responds 201 with the public subset of the new
/// account, never the password in any form.
#[tracing::instrument(skip(pool))]
pub(crate) async fn register(
    Extension(pool): Extension<PgPool>,
    Json(new_user): Json<UserCreation>,
) -> Result<impl IntoResponse, ApiError> {
    match create_user(&pool, new_user).await? {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(RegisteredUser {
                id: user.id,
                name: user.name,
                email: user.email,
                username: user.username,
            }),
        )),
        Err(CreateUserError::AlreadyExists) => Err(ApiError::UserAlreadyExists),
        Err(CreateUserError::NotCreated) => Err(ApiError::InvalidUserData),
    }
}
