//! Token extraction & Routeguarding
//!
//! The extractors here are the auth gates of the API: a handler that
//! takes one of them as an argument can only run after the gate
//! passed, and receives the verified user id as already-trusted
//! input - handlers never re-derive identity themselves.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use sqlx::PgPool;
use uuid::Uuid;

use crate::{database::get_user_by_id, error_handling::ApiError, token::TokenIssuer};

/// Extractor requiring the client to present a valid session token
///
/// Carries the user id the token was issued for. Note that the
/// account may have been deleted since issuance - anything loading
/// the user has to handle the id no longer resolving.
#[derive(Clone, Debug)]
pub(crate) struct Authenticated(
    /// The verified user id
    pub(crate) Uuid,
);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Sync + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::NotLoggedIn)?;
        let header = header
            .to_str()
            .map_err(|e| ApiError::MisformedAuth(e.into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::NotLoggedIn)?;

        let issuer = parts
            .extensions
            .get::<Arc<TokenIssuer>>()
            .expect("TokenIssuer is missing from extensions");

        let user_id = issuer.verify(token).map_err(|_| ApiError::InvalidToken)?;

        Ok(Authenticated(user_id))
    }
}

/// Extractor additionally requiring the account to be an admin
///
/// Builds on [Authenticated] and then checks the admin flag against
/// the database, so revoking the flag takes effect immediately and
/// not only when the token expires.
#[derive(Clone, Debug)]
pub(crate) struct AdminOnly(
    /// The verified admin user id
    pub(crate) Uuid,
);

#[async_trait]
impl<S> FromRequestParts<S> for AdminOnly
where
    S: Sync + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(user_id) = Authenticated::from_request_parts(parts, state).await?;

        let pool = parts
            .extensions
            .get::<PgPool>()
            .expect("Missing PgPool from Extensions");

        let user = get_user_by_id(pool, &user_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if user.is_admin {
            Ok(AdminOnly(user_id))
        } else {
            Err(ApiError::AdminOnly)
        }
    }
}
