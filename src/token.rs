//! Issuing & verifying session tokens
//!
//! A token is a signed, time-bounded statement that the bearer is the
//! user with the embedded id. Tokens are stateless - nothing is stored
//! on the server, logging out is simply forgetting the token - so the
//! only inputs here are the signing secret and the validity window
//! from the configuration.

use std::fmt;

use color_eyre::Report;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::settings::AuthConfig;

/// The claims carried inside a session token
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Id of the user the token was issued for
    pub(crate) sub: Uuid,
    /// Unix timestamp of issuance
    pub(crate) iat: i64,
    /// Unix timestamp after which the token is rejected
    pub(crate) exp: i64,
}

/// Creates and checks the signed session tokens handed out on login
pub(crate) struct TokenIssuer {
    /// Key the tokens are signed with (HS256)
    encoding_key: EncodingKey,
    /// Counterpart of [Self::encoding_key] for verification
    decoding_key: DecodingKey,
    /// How long an issued token stays valid
    validity: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub(crate) fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_secret.as_bytes()),
            validity: Duration::hours(config.token_validity_hours),
        }
    }

    /// Issues a fresh token for the given user id
    pub(crate) fn issue(&self, user_id: &Uuid) -> Result<String, Report> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: *user_id,
            iat: now.unix_timestamp(),
            exp: (now + self.validity).unix_timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Checks signature & expiry and returns the embedded user id
    ///
    /// Every way a token can be unacceptable (bad signature, expired,
    /// not even a token) collapses into the single error here - the
    /// caller only needs to know that the bearer is not logged in.
    pub(crate) fn verify(&self, token: &str) -> Result<Uuid, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;

        Ok(data.claims.sub)
    }
}
