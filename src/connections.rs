//! Following / not-following partitions and per-post relationship labels.
//!
//! Everything here is derived from three user lists fetched independently
//! (the subject's followees, all users, the viewer's followees) and is
//! recomputed whenever any of them changes. Nothing is persisted.

use crate::model::{User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of entries shown in the profile sidebar lists.
pub const SIDEBAR_LIMIT: usize = 6;

/// Relationship of the viewer to a post's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLabel {
    /// The viewer wrote the post.
    #[serde(rename = "self")]
    SelfAuthored,
    /// The viewer follows the author.
    Following,
    /// The viewer does not follow the author.
    NotFollowing,
}

impl RelationshipLabel {
    /// Wire name: `self`, `following`, `not_following`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelfAuthored => "self",
            Self::Following => "following",
            Self::NotFollowing => "not_following",
        }
    }

    /// Text shown on the relationship pill.
    #[must_use]
    pub const fn pill(self) -> &'static str {
        match self {
            Self::SelfAuthored => "You",
            Self::Following => "Following",
            Self::NotFollowing => "Not following",
        }
    }

    /// Label derived from a feed item's `in_network` signal. A feed never
    /// labels the viewer's own posts through this path.
    #[must_use]
    pub const fn from_in_network(in_network: bool) -> Self {
        if in_network {
            Self::Following
        } else {
            Self::NotFollowing
        }
    }
}

impl std::fmt::Display for RelationshipLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which connection list the profile shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionView {
    /// Users the subject follows.
    #[default]
    Following,
    /// Users the subject does not follow (discovery list).
    NotFollowing,
}

impl ConnectionView {
    /// Message shown when the selected list is empty.
    #[must_use]
    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Following => "Not following anyone yet.",
            Self::NotFollowing => "Everyone here is already followed.",
        }
    }
}

/// Raw inputs for [`ConnectionSets::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInputs<'a> {
    pub subject_id: UserId,
    pub viewer_id: UserId,
    pub subject_following: &'a [User],
    pub all_users: &'a [User],
    pub viewer_following: &'a [User],
}

/// Derived connection sets for a (viewer, subject) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSets {
    subject_id: UserId,
    viewer_id: UserId,
    following_of_subject: Vec<User>,
    following_ids: HashSet<UserId>,
    not_following_of_subject: Vec<User>,
    following_of_viewer: HashSet<UserId>,
}

impl ConnectionSets {
    /// Compute every derived set from the raw lists.
    ///
    /// `not_following` keeps the order of `all_users` and excludes the
    /// subject and everyone the subject follows.
    #[must_use]
    pub fn resolve(inputs: ConnectionInputs<'_>) -> Self {
        let following_ids: HashSet<UserId> =
            inputs.subject_following.iter().map(|u| u.id).collect();

        let not_following_of_subject = inputs
            .all_users
            .iter()
            .filter(|u| u.id != inputs.subject_id && !following_ids.contains(&u.id))
            .cloned()
            .collect();

        let following_of_viewer = inputs.viewer_following.iter().map(|u| u.id).collect();

        Self {
            subject_id: inputs.subject_id,
            viewer_id: inputs.viewer_id,
            following_of_subject: inputs.subject_following.to_vec(),
            following_ids,
            not_following_of_subject,
            following_of_viewer,
        }
    }

    #[must_use]
    pub const fn subject_id(&self) -> UserId {
        self.subject_id
    }

    #[must_use]
    pub const fn viewer_id(&self) -> UserId {
        self.viewer_id
    }

    /// Users the subject follows, in fetch order.
    #[must_use]
    pub fn following(&self) -> &[User] {
        &self.following_of_subject
    }

    /// Ids of users the subject follows.
    #[must_use]
    pub const fn following_ids(&self) -> &HashSet<UserId> {
        &self.following_ids
    }

    /// Users the subject does not follow, in `all_users` order.
    #[must_use]
    pub fn not_following(&self) -> &[User] {
        &self.not_following_of_subject
    }

    /// Ids of users the viewer follows.
    #[must_use]
    pub const fn viewer_following_ids(&self) -> &HashSet<UserId> {
        &self.following_of_viewer
    }

    /// The list selected by `view`.
    #[must_use]
    pub fn connection_list(&self, view: ConnectionView) -> &[User] {
        match view {
            ConnectionView::Following => self.following(),
            ConnectionView::NotFollowing => self.not_following(),
        }
    }

    /// Relationship of the viewer to a post by `author_id`.
    ///
    /// The viewer's own posts are always [`RelationshipLabel::SelfAuthored`],
    /// whatever the follow sets contain.
    #[must_use]
    pub fn label_for(&self, author_id: UserId) -> RelationshipLabel {
        relationship_label(self.viewer_id, &self.following_of_viewer, author_id)
    }
}

/// Three-way relationship label of `viewer_id` towards `author_id`.
#[must_use]
pub fn relationship_label(
    viewer_id: UserId,
    viewer_following_ids: &HashSet<UserId>,
    author_id: UserId,
) -> RelationshipLabel {
    if author_id == viewer_id {
        RelationshipLabel::SelfAuthored
    } else if viewer_following_ids.contains(&author_id) {
        RelationshipLabel::Following
    } else {
        RelationshipLabel::NotFollowing
    }
}

/// Stable prefix of at most [`SIDEBAR_LIMIT`] users.
#[must_use]
pub fn sidebar(users: &[User]) -> &[User] {
    &users[..users.len().min(SIDEBAR_LIMIT)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user(id: UserId) -> User {
        User {
            id,
            handle: format!("user{id}"),
            display_name: format!("User {id}"),
            bio: String::new(),
            avatar_url: String::new(),
            persona_type: "casual".to_string(),
        }
    }

    fn users(ids: &[UserId]) -> Vec<User> {
        ids.iter().copied().map(user).collect()
    }

    #[test]
    fn not_following_excludes_subject_and_followees_in_input_order() {
        let all = users(&[5, 1, 4, 2, 3]);
        let following = users(&[4, 1]);
        let sets = ConnectionSets::resolve(ConnectionInputs {
            subject_id: 2,
            viewer_id: 1,
            subject_following: &following,
            all_users: &all,
            viewer_following: &[],
        });
        let ids: Vec<UserId> = sets.not_following().iter().map(|u| u.id).collect();
        assert_eq!(ids, [5, 3]);
        assert_eq!(sets.connection_list(ConnectionView::Following), &following[..]);
    }

    #[test]
    fn own_posts_are_self_even_if_viewer_follows_themself() {
        let viewer_following = users(&[1, 2]);
        let sets = ConnectionSets::resolve(ConnectionInputs {
            subject_id: 3,
            viewer_id: 1,
            subject_following: &[],
            all_users: &[],
            viewer_following: &viewer_following,
        });
        assert_eq!(sets.label_for(1), RelationshipLabel::SelfAuthored);
        assert_eq!(sets.label_for(2), RelationshipLabel::Following);
        assert_eq!(sets.label_for(9), RelationshipLabel::NotFollowing);
    }

    #[test]
    fn labels_serialize_to_wire_names() {
        let json = serde_json::to_string(&[
            RelationshipLabel::SelfAuthored,
            RelationshipLabel::Following,
            RelationshipLabel::NotFollowing,
        ])
        .unwrap();
        assert_eq!(json, r#"["self","following","not_following"]"#);
        assert_eq!(RelationshipLabel::SelfAuthored.pill(), "You");
    }

    #[test]
    fn sidebar_is_a_stable_prefix() {
        let all = users(&[9, 8, 7, 6, 5, 4, 3, 2]);
        let ids: Vec<UserId> = sidebar(&all).iter().map(|u| u.id).collect();
        assert_eq!(ids, [9, 8, 7, 6, 5, 4]);
        assert_eq!(sidebar(&all[..2]).len(), 2);
    }

    #[test]
    fn empty_messages_per_view() {
        assert_eq!(
            ConnectionView::NotFollowing.empty_message(),
            "Everyone here is already followed."
        );
    }

    proptest! {
        #[test]
        fn partitions_are_disjoint_and_cover_all_users(
            all_ids in proptest::collection::vec(0i64..30, 0..30),
            following_ids in proptest::collection::vec(0i64..30, 0..15),
            subject in 0i64..30,
        ) {
            let all = users(&all_ids);
            let following = users(&following_ids);
            let sets = ConnectionSets::resolve(ConnectionInputs {
                subject_id: subject,
                viewer_id: 0,
                subject_following: &following,
                all_users: &all,
                viewer_following: &[],
            });

            for u in sets.not_following() {
                prop_assert!(!sets.following_ids().contains(&u.id));
                prop_assert_ne!(u.id, subject);
            }
            let not_following: HashSet<UserId> =
                sets.not_following().iter().map(|u| u.id).collect();
            for u in &all {
                prop_assert!(
                    not_following.contains(&u.id)
                        || sets.following_ids().contains(&u.id)
                        || u.id == subject
                );
            }
        }

        #[test]
        fn viewer_posts_are_always_self(
            viewer in 0i64..20,
            followed in proptest::collection::vec(0i64..20, 0..20),
        ) {
            let viewer_following = users(&followed);
            let sets = ConnectionSets::resolve(ConnectionInputs {
                subject_id: viewer,
                viewer_id: viewer,
                subject_following: &[],
                all_users: &[],
                viewer_following: &viewer_following,
            });
            prop_assert_eq!(sets.label_for(viewer), RelationshipLabel::SelfAuthored);
        }
    }
}
