//! All methods to talk to the database reside here.
//!
//! This makes any changes to tables, relations etc. easier.
//! Uniqueness of usernames and emails is enforced by the UNIQUE
//! constraints of the `users` table, not by look-before-insert - the
//! constraint violation is the authoritative "already exists" signal,
//! so concurrent registrations cannot slip past each other.

pub(crate) mod auth;

use std::time::Duration;

use color_eyre::{
    eyre::{eyre, Context},
    Report,
};

use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::{debug, debug_span, info, Instrument};
use uuid::Uuid;

use crate::{
    settings::DbConfig,
    types::{EMail, Password},
};

use self::auth::Credentials;

/// Postgres error code for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// Whether `error` is the `users` table telling us a username or email
/// is already taken
fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.code().as_deref() == Some(UNIQUE_VIOLATION))
}

/// The columns of `users` that are safe to hand out
///
/// Every query in this module selects exactly these, so a password
/// hash can not be returned on accident - not even by the admin
/// listing.
const PUBLIC_COLUMNS: &str = "id, name, username, email, mobile, nationality, is_admin";

/// The public projection of the `users` table
///
/// This deliberately has no password field at all, so serializing it
/// anywhere is safe.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Serialize, sqlx::FromRow)]
pub(crate) struct User {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) username: String,
    pub(crate) email: EMail,
    pub(crate) mobile: Option<String>,
    pub(crate) nationality: Option<String>,
    #[serde(rename = "isAdmin")]
    pub(crate) is_admin: bool,
}

/// Everything needed to create a new account - missing the id, which
/// is assigned here
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Deserialize)]
pub(crate) struct UserCreation {
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) email: EMail,
    pub(crate) password: Password,
    pub(crate) mobile: Option<String>,
    pub(crate) nationality: Option<String>,
}

/// The updatable subset of [User] as [Options](::std::option)
///
/// An absent field keeps the stored value, a present field is written
/// verbatim - including an empty string. Presence is the only signal,
/// there is no "truthiness" involved.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Deserialize)]
pub(crate) struct UserUpdate {
    pub(crate) name: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) mobile: Option<String>,
    pub(crate) nationality: Option<String>,
}

/// Connects to the database given by `config`, setting the application
/// name to "pfoertner"
#[tracing::instrument(skip(config))]
pub(crate) async fn connect(config: &DbConfig) -> color_eyre::Result<PgPool> {
    let options = std::convert::TryInto::<PgConnectOptions>::try_into(config)
        .wrap_err("Failed parsing database URL")?
        .application_name("pfoertner");

    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .instrument(debug_span!("Connecting to DB"))
        .await
        .wrap_err("Connecting to database")
}

/// Returns the number of registered users
#[tracing::instrument(skip(pool))]
pub(crate) async fn count_user(pool: &PgPool) -> Result<i64, Report> {
    sqlx::query_scalar::<_, Option<i64>>("SELECT Count(*) FROM users")
        .fetch_one(pool)
        .await?
        .ok_or_else(|| eyre!("Count was None (should not happen)"))
}

/// If no user exists, this tries to create a new admin user
/// with the given credentials.
///
/// No handler can set the admin flag, so this is the only way an admin
/// account comes to exist. Not creating the admin is not considered a
/// failure since it is assumed that this is only desirable on new
/// installations.
///
/// # Note:
/// This method can include a (safe) race condition if running
/// multiple instances connecting to the same database and specifying
/// different credentials: it is not specified nor predictable how
/// many admins will be created and which ones, only that it is at
/// least one. To prevent that make sure that the same admin + password
/// is chosen by all instances.
#[tracing::instrument(skip(pool))]
pub(crate) async fn create_admin_if_no_user_exist(
    pool: &PgPool,
    Credentials { password, email }: &Credentials,
) -> Result<(), Report> {
    let hash = password.hash()?;

    if count_user(pool).await? == 0 {
        debug!("No user exist: Creating some.");
        let query_result = sqlx::query(
            r#"
    INSERT INTO users (id, email, password, name, username, is_admin)
        VALUES ($1, $2, $3, 'Admin', 'admin', TRUE)
        ON CONFLICT DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hash.as_str())
        .execute(pool)
        .await?;

        if query_result.rows_affected() == 0 {
            debug!("Other instance already created an admin");
        } else {
            info!("Successfully created admin user");
        }
    } else {
        debug!("User already exist - doing nothing");
    }

    Ok(())
}

/// The known errors which can occur when calling [create_user]
pub(crate) enum CreateUserError {
    /// The username or email is already taken
    AlreadyExists,
    /// The insert went through without yielding the new row
    NotCreated,
}

/// Creates a new user with a freshly hashed password
///
/// The double result is used as always: the outer for unexpected
/// errors, the inner for the ones the caller can do something about.
#[tracing::instrument(skip(pool))]
pub(crate) async fn create_user(
    pool: &PgPool,
    UserCreation {
        username,
        name,
        email,
        password,
        mobile,
        nationality,
    }: UserCreation,
) -> Result<Result<User, CreateUserError>, Report> {
    let id = Uuid::new_v4();
    let hash = password.hash()?;

    let created = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO
            users (id, username, name, email, password, mobile, nationality)
         VALUES
            ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(id)
    .bind(&username)
    .bind(&name)
    .bind(&email)
    .bind(hash.as_str())
    .bind(&mobile)
    .bind(&nationality)
    .fetch_optional(pool)
    .await;

    match created {
        Ok(Some(user)) => Ok(Ok(user)),
        Ok(None) => Ok(Err(CreateUserError::NotCreated)),
        Err(e) if is_unique_violation(&e) => Ok(Err(CreateUserError::AlreadyExists)),
        Err(e) => Err(e.into()),
    }
}

#[tracing::instrument(skip(pool))]
pub(crate) async fn get_user_by_id(pool: &PgPool, user_id: &Uuid) -> Result<Option<User>, Report> {
    Ok(sqlx::query_as::<_, User>(&format!(
        "SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// Returns every user in the public projection
#[tracing::instrument(skip(pool))]
pub(crate) async fn list_user(pool: &PgPool) -> Result<Vec<User>, Report> {
    Ok(sqlx::query_as::<_, User>(&format!(
        "SELECT {PUBLIC_COLUMNS} FROM users ORDER BY name"
    ))
    .fetch_all(pool)
    .await?)
}

/// The known errors which can occur when calling [update_user]
pub(crate) enum UpdateUserError {
    /// No user with the given id
    NotFound,
    /// The new username is already taken
    AlreadyExists,
}

/// Applies a partial update to the user with the given id
///
/// Only the fields present in `update` are written (`coalesce` keeps
/// the stored value for the absent ones). Email and password are not
/// reachable through this.
#[tracing::instrument(skip(pool))]
pub(crate) async fn update_user(
    pool: &PgPool,
    user_id: &Uuid,
    update: UserUpdate,
) -> Result<Result<User, UpdateUserError>, Report> {
    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE
            users
        SET
            name = coalesce($2, name),
            username = coalesce($3, username),
            mobile = coalesce($4, mobile),
            nationality = coalesce($5, nationality)
        WHERE
            id = $1
        RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&update.name)
    .bind(&update.username)
    .bind(&update.mobile)
    .bind(&update.nationality)
    .fetch_optional(pool)
    .await;

    match updated {
        Ok(Some(user)) => Ok(Ok(user)),
        Ok(None) => Ok(Err(UpdateUserError::NotFound)),
        Err(e) if is_unique_violation(&e) => Ok(Err(UpdateUserError::AlreadyExists)),
        Err(e) => Err(e.into()),
    }
}
