//! Length-checked text newtypes.
//!
//! Lengths are counted in `char`s. Every type validates on construction and on
//! deserialization, so a value of one of these types is always within bounds.

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidTextError {
    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must not exceed {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} contains invalid characters")]
    InvalidCharacters { field: &'static str },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Trim {
    Keep,
    /// Surrounding whitespace is removed before the lower bound is checked.
    /// The upper bound applies to the untrimmed input.
    Trim,
}

fn check_bounds(
    field: &'static str,
    input: String,
    min: usize,
    max: usize,
    trim: Trim,
) -> Result<String, InvalidTextError> {
    if input.chars().count() > max {
        return Err(InvalidTextError::TooLong { field, max });
    }

    let value = match trim {
        Trim::Keep => input,
        Trim::Trim if input.trim().len() == input.len() => input,
        Trim::Trim => input.trim().to_owned(),
    };

    if value.chars().count() < min {
        return Err(InvalidTextError::TooShort { field, min });
    }

    Ok(value)
}

macro_rules! bounded_text {
    ($(#[$meta:meta])* $name:ident: $field:literal, $min:literal..=$max:literal, $trim:ident) => {
        $(#[$meta])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const MIN_LEN: usize = $min;
            pub const MAX_LEN: usize = $max;

            pub fn new(value: impl Into<String>) -> Result<Self, InvalidTextError> {
                check_bounds($field, value.into(), $min, $max, Trim::$trim).map(Self)
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

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = String::deserialize(deserializer)?;
                $name::new(inner.as_str())
                    .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &stringify!($name)))
            }
        }
    };
}

bounded_text!(PostTitle: "Title", 5..=200, Keep);
bounded_text!(PostContent: "Content", 10..=50_000, Keep);
bounded_text!(
    /// Free-text country name as entered by the author.
    Country: "Country", 1..=100, Trim
);
bounded_text!(
    /// Comment body, stored trimmed.
    CommentContent: "Comment", 1..=1000, Trim
);
bounded_text!(PersonName: "Name", 1..=50, Trim);
bounded_text!(ProfileImage: "Profile image", 1..=255, Trim);
bounded_text!(
    /// Substring matched against usernames and real names.
    SearchTerm: "Search query", 2..=100, Trim
);
