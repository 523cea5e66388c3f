//! Like/dislike votes.
//!
//! A user holds at most one vote per post. Voting is a toggle: repeating the
//! current vote retracts it, voting the other way switches it in place.
//! Dislikes are stored but never counted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Vote {
    Like,
    Dislike,
}

impl Vote {
    #[must_use]
    pub fn from_is_like(is_like: bool) -> Self {
        if is_like { Self::Like } else { Self::Dislike }
    }

    #[must_use]
    pub fn is_like(self) -> bool {
        self == Self::Like
    }
}

impl Serialize for Vote {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(self.is_like())
    }
}

impl<'de> Deserialize<'de> for Vote {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        bool::deserialize(deserializer).map(Vote::from_is_like)
    }
}

/// What the engagement ledger has to do with the `(user, post)` record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum VoteTransition {
    /// No record yet: insert one.
    Cast(Vote),
    /// Same vote again: delete the record.
    Retract,
    /// Opposite vote: update the record in place.
    Switch(Vote),
}

impl VoteTransition {
    #[must_use]
    pub fn plan(existing: Option<Vote>, requested: Vote) -> Self {
        match existing {
            None => Self::Cast(requested),
            Some(current) if current == requested => Self::Retract,
            Some(_) => Self::Switch(requested),
        }
    }

    #[must_use]
    pub fn resulting_vote(self) -> Option<Vote> {
        match self {
            Self::Cast(vote) | Self::Switch(vote) => Some(vote),
            Self::Retract => None,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub likes_count: u32,
    pub user_vote: Option<Vote>,
}
