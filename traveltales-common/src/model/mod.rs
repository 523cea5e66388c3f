pub mod auth;
pub mod comment;
pub mod engagement;
pub mod graph;
pub mod pagination;
pub mod post;
pub mod text;
pub mod user;

use crate::{
    model::{auth::InvalidSessionTokenHashError, text::InvalidTextError, user::InvalidEmailError},
    util::NonPositiveDurationError,
};
use derive_where::derive_where;
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Text(#[from] InvalidTextError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidSessionTokenHashError),
    #[error("Counter value out of range: {0}")]
    Counter(i64),
}

/// Database-assigned identifier, tagged with the kind of entity it refers to.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(i64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<i64> for Id<Marker> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for i64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Converts a database aggregate into a non-negative counter.
pub fn counter(value: i64) -> Result<u32, ModelValidationError> {
    u32::try_from(value).map_err(|_| ModelValidationError::Counter(value))
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, counter, post::PostMarker, user::UserMarker};

    #[test]
    fn id_serializes_as_plain_number() {
        let id = Id::<PostMarker>::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let parsed: Id<UserMarker> = serde_json::from_str("7").unwrap();
        assert_eq!(parsed.get(), 7);
        assert_eq!(parsed.to_string(), "7");
    }

    #[test]
    fn counters_reject_negative_values() {
        assert_eq!(counter(0), Ok(0));
        assert_eq!(counter(25), Ok(25));
        assert!(counter(-1).is_err());
        assert!(counter(i64::MAX).is_err());
    }
}
