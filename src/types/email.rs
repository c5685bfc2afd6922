use core::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// An email address as the client sent it
///
/// No format validation happens here - the address is only ever used
/// as an exact-match lookup key, so a "wrong" address simply never
/// matches anything. The goal for later is to partially anonymize
/// logged addresses for privacy reasons while still allowing
/// development setups to see them in clear.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub(crate) struct EMail(pub(crate) String);

impl Deref for EMail {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for EMail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EMail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
