//! Bearer session tokens.
//!
//! A token reads `{user id}:{secret}:{salt}` with both binary parts base64
//! encoded. Only the argon2 hash of the secret is persisted, so a leaked
//! sessions table cannot be replayed.

use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const SESSION_SECRET_LEN: usize = 24;
pub const SESSION_SALT_LEN: usize = 18;
pub const SESSION_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing session token failed: {0}")]
pub struct SessionTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionTokenDecodeError {
    #[error("Expected three parts separated by ':'")]
    MissingParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The secret part has the wrong length")]
    InvalidSecretLength,
    #[error("The salt part has the wrong length")]
    InvalidSaltLength,
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    pub user_id: Id<UserMarker>,
    secret: [u8; SESSION_SECRET_LEN],
    salt: [u8; SESSION_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionTokenHash(Box<[u8; SESSION_HASH_LEN]>);

/// A stored session as the identity store knows it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub user: Id<UserMarker>,
    pub token_hash: SessionTokenHash,
    pub created_at: OffsetDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Session {
    /// A lifetime reaching past the representable range never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_after.is_some_and(|lifetime| {
            self.created_at
                .checked_add(lifetime.get())
                .is_some_and(|expires_at| expires_at < now)
        })
    }
}

impl SessionToken {
    #[must_use]
    pub fn generate(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            secret: rand::random(),
            salt: rand::random(),
        }
    }

    #[must_use]
    pub fn to_bearer(&self) -> String {
        format!(
            "{}:{}:{}",
            self.user_id,
            Base64Display::new(&self.secret, &BASE64_STANDARD),
            Base64Display::new(&self.salt, &BASE64_STANDARD),
        )
    }

    pub fn hash(&self) -> Result<SessionTokenHash, SessionTokenHashError> {
        let mut hash = Box::new([0; SESSION_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.secret, &self.salt, &mut *hash)
            .map_err(SessionTokenHashError)?;

        Ok(SessionTokenHash(hash))
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_id, rest) = s.split_once(':').ok_or(Self::Err::MissingParts)?;
        let (secret, salt) = rest.split_once(':').ok_or(Self::Err::MissingParts)?;

        Ok(Self {
            user_id: i64::from_str(user_id)
                .map_err(Self::Err::InvalidUserId)?
                .into(),
            secret: BASE64_STANDARD
                .decode(secret)?
                .try_into()
                .map_err(|_| Self::Err::InvalidSecretLength)?,
            salt: BASE64_STANDARD
                .decode(salt)?
                .try_into()
                .map_err(|_| Self::Err::InvalidSaltLength)?,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl SessionTokenHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl Debug for SessionTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionTokenHash([redacted])")
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token hash had an invalid length")]
pub struct InvalidSessionTokenHashError;

impl TryFrom<Vec<u8>> for SessionTokenHash {
    type Error = InvalidSessionTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let bytes: [u8; SESSION_HASH_LEN] =
            value.try_into().map_err(|_| InvalidSessionTokenHashError)?;
        Ok(Self(Box::new(bytes)))
    }
}
