//! The login route
//!
//! Login is the only operation that touches stored credentials and
//! the only one handing out a token for nothing but a password.

use std::sync::Arc;

use axum::{Extension, Json};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::auth::{login_user, Credentials, LoginError},
    error_handling::ApiError,
    token::TokenIssuer,
    types::EMail,
};

/// A successful login: the full own profile plus a fresh token
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Serialize)]
pub(crate) struct LoginResponse {
    id: Uuid,
    name: String,
    email: EMail,
    username: String,
    mobile: Option<String>,
    nationality: Option<String>,
    #[serde(rename = "isAdmin")]
    is_admin: bool,
    token: String,
}

/// Tries to log the user in
///
/// An unknown email and a wrong password both answer with the same
/// 401 - see [LoginError] for why the distinction stops at the
/// database layer.
#[tracing::instrument(skip(pool, issuer))]
pub(crate) async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    match login_user(&pool, credentials).await? {
        Ok(user) => {
            let token = issuer.issue(&user.id)?;

            Ok(Json(LoginResponse {
                id: user.id,
                name: user.name,
                email: user.email,
                username: user.username,
                mobile: user.mobile,
                nationality: user.nationality,
                is_admin: user.is_admin,
                token,
            }))
        }
        Err(LoginError::UserNotFound | LoginError::InvalidCredentials) => {
            Err(ApiError::WrongCredentials)
        }
    }
}
