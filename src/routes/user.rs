use std::sync::Arc;

use axum::{Extension, Json};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{get_user_by_id, update_user, UpdateUserError, User, UserUpdate},
    error_handling::ApiError,
    middlewares::auth::Authenticated,
    token::TokenIssuer,
    types::EMail,
};

/// The body of a successful profile update
///
/// Comes with a fresh token so clients can rotate theirs on every
/// write.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Serialize)]
pub(crate) struct UpdatedUser {
    id: Uuid,
    name: String,
    email: EMail,
    mobile: Option<String>,
    nationality: Option<String>,
    token: String,
}

/// Returns the profile of whoever the token belongs to
#[tracing::instrument(skip(pool))]
pub(crate) async fn get_profile(
    Extension(pool): Extension<PgPool>,
    Authenticated(user_id): Authenticated,
) -> Result<Json<User>, ApiError> {
    let user = get_user_by_id(&pool, &user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(Json(user))
}

/// Partially updates the profile of whoever the token belongs to
///
/// Only name, username, mobile and nationality are reachable - email
/// and password have no update path here.
#[tracing::instrument(skip(pool, issuer))]
pub(crate) async fn update_profile(
    Extension(pool): Extension<PgPool>,
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    Authenticated(user_id): Authenticated,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UpdatedUser>, ApiError> {
    match update_user(&pool, &user_id, update).await? {
        Ok(user) => {
            let token = issuer.issue(&user.id)?;

            Ok(Json(UpdatedUser {
                id: user.id,
                name: user.name,
                email: user.email,
                mobile: user.mobile,
                nationality: user.nationality,
                token,
            }))
        }
        Err(UpdateUserError::NotFound) => Err(ApiError::UserNotFound),
        Err(UpdateUserError::AlreadyExists) => Err(ApiError::UserAlreadyExists),
    }
}
