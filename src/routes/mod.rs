use axum::{response::IntoResponse, Extension, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::{
    database::{list_user, User},
    error_handling::ApiError,
    middlewares::auth::AdminOnly,
};

pub(crate) mod healthcheck;
pub(crate) mod login;
pub(crate) mod register;
pub(crate) mod user;

/// The body of the admin listing
#[derive(Serialize)]
struct UserList {
    /// Every account, in the public projection
    users: Vec<User>,
}

/// Admin-only listing of all accounts
///
/// The gate is the [AdminOnly] extractor; the elements are the public
/// projection, so no password hash can end up in here.
#[tracing::instrument(skip(pool))]
pub(crate) async fn list_users(
    Extension(pool): Extension<PgPool>,
    AdminOnly(admin_id): AdminOnly,
) -> Result<impl IntoResponse, ApiError> {
    let users = list_user(&pool).await?;

    Ok(Json(UserList { users }))
}
