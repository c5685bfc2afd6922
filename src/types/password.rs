use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHashString, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use color_eyre::Report;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Safely store passwords
///
/// Wraps the plaintext in a [SecretString] so that it is redacted from
/// any `Debug` output and - since there deliberately is no `Serialize`
/// impl - can never end up in a response body.
///
/// This is safer then always remember to `skip` the private details in
/// for example [macro@tracing::instrument]
#[derive(Debug, Deserialize)]
pub(crate) struct Password(pub(crate) SecretString);

impl Password {
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Hashes the password with a fresh random salt
    ///
    /// The work factor is whatever [Argon2::default] currently is,
    /// uniform for every account.
    pub(crate) fn hash(&self) -> Result<PasswordHashString, Report> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2.hash_password(self.expose().as_bytes(), &salt)?;

        Ok(hash.to_owned().serialize())
    }

    /// Checks the password against a stored hash
    ///
    /// A non-matching password is `Ok(false)`, never an `Err` - only a
    /// malformed hash or an internal hashing failure errors out.
    pub(crate) fn match_hash(&self, hash: &str) -> Result<bool, Report> {
        let hash = PasswordHash::new(hash)?;

        Argon2::default()
            .verify_password(self.expose().as_bytes(), &hash)
            .map(|_| true)
            .or_else(|e| match e {
                password_hash::Error::Password => Ok(false),
                e => Err(e.into()),
            })
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self(s.to_owned().into())
    }
}
