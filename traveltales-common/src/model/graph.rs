//! Follow relationships as an explicit two-state machine.
//!
//! Every `(follower, following)` pair is either [`FollowState::NotFollowing`]
//! or [`FollowState::Following`]. A toggle request never inspects rows
//! directly; it derives a [`FollowTransition`] from the current state and the
//! store applies exactly that transition.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum FollowState {
    #[default]
    NotFollowing,
    Following,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum FollowTransition {
    /// Create the edge.
    Follow,
    /// Hard-delete the edge.
    Unfollow,
}

impl FollowState {
    #[must_use]
    pub fn from_edge(edge_exists: bool) -> Self {
        if edge_exists {
            Self::Following
        } else {
            Self::NotFollowing
        }
    }

    #[must_use]
    pub fn is_following(self) -> bool {
        self == Self::Following
    }

    #[must_use]
    pub fn toggle(self) -> FollowTransition {
        match self {
            Self::NotFollowing => FollowTransition::Follow,
            Self::Following => FollowTransition::Unfollow,
        }
    }
}

impl FollowTransition {
    #[must_use]
    pub fn resulting_state(self) -> FollowState {
        match self {
            Self::Follow => FollowState::Following,
            Self::Unfollow => FollowState::NotFollowing,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipCounts {
    pub follower_count: u64,
    pub following_count: u64,
}

#[cfg(test)]
mod tests {
    use crate::model::graph::{FollowState, FollowTransition};

    #[test]
    fn toggle_flips_state() {
        assert_eq!(FollowState::NotFollowing.toggle(), FollowTransition::Follow);
        assert_eq!(FollowState::Following.toggle(), FollowTransition::Unfollow);

        for state in [FollowState::NotFollowing, FollowState::Following] {
            let once = state.toggle().resulting_state();
            assert_ne!(once, state);
            assert_eq!(once.toggle().resulting_state(), state);
        }
    }

    #[test]
    fn state_from_edge() {
        assert!(FollowState::from_edge(true).is_following());
        assert!(!FollowState::from_edge(false).is_following());
        assert_eq!(FollowState::default(), FollowState::NotFollowing);
    }
}
