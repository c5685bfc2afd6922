//! Checking credentials
//!
//! This is the only file that is supposed to see and
//! interact with the passwords saved in the database.
//! Limiting this to this file allows easier changes
//! to hashing algorithms, security updates and helps
//! hiding passwords from attackers

use color_eyre::Report;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::{EMail, Password};

use super::User;

/// Expected errors during login
///
/// The two causes are kept apart here for logging, but the HTTP layer
/// answers both with the same status and message - a client must not
/// be able to probe which emails have accounts.
pub(crate) enum LoginError {
    /// No account under the given email
    UserNotFound,
    /// Account exists, password does not match
    InvalidCredentials,
}

/// Unhashed Login Credentials
#[derive(Deserialize, Debug)]
pub(crate) struct Credentials {
    // Self-explanatory, doc would just be noise
    #[allow(clippy::missing_docs_in_private_items)]
    pub(crate) email: EMail,
    /// Unhashed password
    pub(crate) password: Password,
}

/// The row shape of the single query that may read the password column
#[allow(clippy::missing_docs_in_private_items)]
#[derive(sqlx::FromRow)]
struct SavedUser {
    id: Uuid,
    name: String,
    username: String,
    email: EMail,
    mobile: Option<String>,
    nationality: Option<String>,
    is_admin: bool,
    password: String,
}

/// Checks credentials and returns the user
///
/// The double result is used as always:
/// The outside result contains unexpected errors, the inner the
/// expected ones, see [LoginError] for those.
#[tracing::instrument(skip(pool))]
pub(crate) async fn login_user(
    pool: &PgPool,
    credentials: Credentials,
) -> Result<Result<User, LoginError>, Report> {
    let saved_user = sqlx::query_as::<_, SavedUser>(
        "SELECT id, name, username, email, mobile, nationality, is_admin, password
         FROM users WHERE email = $1",
    )
    .bind(&credentials.email)
    .fetch_optional(pool)
    .await?;

    let Some(saved_user) = saved_user else {
        // Expected error, so outer Ok
        return Ok(Err(LoginError::UserNotFound));
    };

    if !credentials.password.match_hash(&saved_user.password)? {
        return Ok(Err(LoginError::InvalidCredentials));
    }

    Ok(Ok(User {
        id: saved_user.id,
        name: saved_user.name,
        username: saved_user.username,
        email: saved_user.email,
        mobile: saved_user.mobile,
        nationality: saved_user.nationality,
        is_admin: saved_user.is_admin,
    }))
}
