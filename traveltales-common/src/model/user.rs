use crate::model::{
    Id,
    graph::RelationshipCounts,
    post::PostSummary,
    text::{InvalidTextError, PersonName, ProfileImage},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The public face of a user, embedded wherever someone is referenced.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
}

/// Everything the identity store keeps about a user.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserAccount {
    pub user: User,
    pub email: Email,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: Username,
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<PersonName>,
    #[serde(default)]
    pub last_name: Option<PersonName>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Profile fields a user may edit. Omitted fields keep their current value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(default)]
    pub first_name: Option<PersonName>,
    #[serde(default)]
    pub last_name: Option<PersonName>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<ProfileImage>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub counts: RelationshipCounts,
    pub is_following: bool,
    pub recent_posts: Vec<PostSummary>,
}

/// Unique login name: 3 to 50 ASCII letters or digits.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(username: impl Into<String>) -> Result<Self, InvalidTextError> {
        let username = username.into();
        let len = username.chars().count();

        if len < USERNAME_MIN_LEN {
            Err(InvalidTextError::TooShort {
                field: "Username",
                min: USERNAME_MIN_LEN,
            })
        } else if len > USERNAME_MAX_LEN {
            Err(InvalidTextError::TooLong {
                field: "Username",
                max: USERNAME_MAX_LEN,
            })
        } else if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
            Err(InvalidTextError::InvalidCharacters { field: "Username" })
        } else {
            Ok(Self(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner.as_str())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"Username"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

/// Lower-cased email address with a plausible `local@domain.tld` shape.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Result<Self, InvalidEmailError> {
        let email = email.into().trim().to_lowercase();

        let well_formed = email.chars().count() <= EMAIL_MAX_LEN
            && !email.chars().any(char::is_whitespace)
            && email.split_once('@').is_some_and(|(local, domain)| {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .rsplit_once('.')
                        .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
            });

        if well_formed {
            Ok(Self(email))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner.as_str())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"Email"))
    }
}
