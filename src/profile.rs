//! Profile view for one subject.
//!
//! A load issues six independent reads at once: the subject, their posts,
//! their followers, who they follow, who the viewer follows, and every
//! user. Each read lands on its own field; a failed read leaves that field
//! as it was. Loads take `&mut self`, so two loads of the same view can
//! never overlap.

use crate::backend::FeedBackend;
use crate::connections::{
    ConnectionInputs, ConnectionSets, ConnectionView, RelationshipLabel, sidebar,
};
use crate::error::{FeedError, Result};
use crate::logging::OperationGuard;
use crate::model::{LikeResponse, Post, PostId, User, UserId};
use crate::session::SideChannel;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Per-read outcome of [`ProfileView::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLoad {
    pub user: SideChannel,
    pub posts: SideChannel,
    pub followers: SideChannel,
    pub following: SideChannel,
    pub viewer_following: SideChannel,
    pub all_users: SideChannel,
}

impl ProfileLoad {
    /// Whether every read succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            self.user,
            self.posts,
            self.followers,
            self.following,
            self.viewer_following,
            self.all_users,
        ]
        .iter()
        .all(|c| matches!(c, SideChannel::Applied(_)))
    }
}

/// Everything the profile page shows, as plain data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileData {
    pub user: Option<User>,
    pub posts: Vec<Post>,
    pub followers: Vec<User>,
    pub following: Vec<User>,
    pub viewer_following: Vec<User>,
    pub all_users: Vec<User>,
}

/// Loader and derived views for a subject's profile.
pub struct ProfileView<B> {
    backend: B,
    viewer_id: UserId,
    subject_id: UserId,
    data: ProfileData,
}

impl<B: FeedBackend> ProfileView<B> {
    /// Empty profile of `subject_id` as seen by `viewer_id`.
    pub const fn new(backend: B, viewer_id: UserId, subject_id: UserId) -> Self {
        Self {
            backend,
            viewer_id,
            subject_id,
            data: ProfileData {
                user: None,
                posts: Vec::new(),
                followers: Vec::new(),
                following: Vec::new(),
                viewer_following: Vec::new(),
                all_users: Vec::new(),
            },
        }
    }

    pub const fn viewer_id(&self) -> UserId {
        self.viewer_id
    }

    pub const fn subject_id(&self) -> UserId {
        self.subject_id
    }

    pub const fn data(&self) -> &ProfileData {
        &self.data
    }

    pub const fn user(&self) -> Option<&User> {
        self.data.user.as_ref()
    }

    pub fn posts(&self) -> &[Post] {
        &self.data.posts
    }

    /// Issue all six reads concurrently and apply whichever succeed.
    pub async fn load(&mut self) -> ProfileLoad {
        let op = OperationGuard::new("profile load");
        let subject = self.subject_id;
        let backend = &self.backend;

        let (user, posts, followers, following, viewer_following, all_users) = tokio::join!(
            backend.user(subject),
            backend.user_posts(subject),
            backend.followers(subject),
            backend.following(subject),
            backend.following(self.viewer_id),
            backend.users(),
        );

        let report = ProfileLoad {
            user: apply("user", user.map(Some), &mut self.data.user, |u| {
                usize::from(u.is_some())
            }),
            posts: apply("posts", posts, &mut self.data.posts, Vec::len),
            followers: apply("followers", followers, &mut self.data.followers, Vec::len),
            following: apply("following", following, &mut self.data.following, Vec::len),
            viewer_following: apply(
                "viewer following",
                viewer_following,
                &mut self.data.viewer_following,
                Vec::len,
            ),
            all_users: apply("users", all_users, &mut self.data.all_users, Vec::len),
        };

        info!(subject, complete = report.is_complete(), "Profile loaded");
        op.complete();
        report
    }

    /// Like `post_id` as the viewer, then re-read only the subject's posts.
    ///
    /// A failed re-read after a successful like is logged and leaves the
    /// posts as they were.
    ///
    /// # Errors
    ///
    /// Returns the like request's error; nothing changes in that case.
    pub async fn like_post(&mut self, post_id: PostId) -> Result<LikeResponse> {
        let like = self
            .backend
            .like_post(post_id, self.viewer_id)
            .await
            .inspect_err(|err| {
                warn!(post_id, kind = %err.kind(), error = %err, "Like failed");
            })?;
        debug!(post_id, like_count = like.like_count, "Liked post");

        let posts = self.backend.user_posts(self.subject_id).await;
        apply("posts", posts, &mut self.data.posts, Vec::len);
        Ok(like)
    }

    /// Connection sets derived from the current lists.
    #[must_use]
    pub fn connection_sets(&self) -> ConnectionSets {
        ConnectionSets::resolve(ConnectionInputs {
            subject_id: self.subject_id,
            viewer_id: self.viewer_id,
            subject_following: &self.data.following,
            all_users: &self.data.all_users,
            viewer_following: &self.data.viewer_following,
        })
    }

    /// First entries of the subject's followees.
    pub fn sidebar_following(&self) -> &[User] {
        sidebar(&self.data.following)
    }

    /// First entries of the subject's followers.
    pub fn sidebar_followers(&self) -> &[User] {
        sidebar(&self.data.followers)
    }

    /// The list selected by `view`.
    #[must_use]
    pub fn connection_list(&self, view: ConnectionView) -> Vec<User> {
        self.connection_sets().connection_list(view).to_vec()
    }

    /// Subject's posts paired with the viewer's relationship to each author.
    #[must_use]
    pub fn labeled_posts(&self) -> Vec<(RelationshipLabel, &Post)> {
        let sets = self.connection_sets();
        self.data
            .posts
            .iter()
            .map(|post| (sets.label_for(post.author.id), post))
            .collect()
    }
}

/// Store `result` into `slot` on success; keep `slot` on failure.
fn apply<T>(
    what: &'static str,
    result: Result<T>,
    slot: &mut T,
    count: impl FnOnce(&T) -> usize,
) -> SideChannel {
    match result {
        Ok(value) => {
            *slot = value;
            SideChannel::Applied(count(slot))
        }
        Err(err) => failed(what, &err),
    }
}

fn failed(what: &'static str, err: &FeedError) -> SideChannel {
    warn!(read = what, kind = %err.kind(), error = %err, "Profile read failed; keeping previous data");
    SideChannel::Failed(err.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{FeedResponse, Graph, Notification, Trend};
    use crate::preferences::RequestParams;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

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

    fn post(id: PostId, author: UserId, likes: i64) -> Post {
        Post {
            id,
            author: user(author),
            content: format!("post {id}"),
            topic: "tech".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            like_count: likes,
            reply_count: 0,
            repost_count: 0,
            quote_count: 0,
            is_reply: false,
            reply_to_id: None,
        }
    }

    fn not_found(endpoint: &str) -> FeedError {
        FeedError::status(endpoint, 404, "not found")
    }

    /// Subject 2 follows 3; viewer 1 follows 2; users 1..=5.
    struct Roster {
        fail_followers: bool,
        fail_like: bool,
        likes: Mutex<i64>,
    }

    impl Roster {
        fn new() -> Self {
            Self {
                fail_followers: false,
                fail_like: false,
                likes: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedBackend for Roster {
        async fn feed(&self, _params: &RequestParams) -> Result<FeedResponse> {
            Err(not_found("feed"))
        }

        async fn trends(&self) -> Result<Vec<Trend>> {
            Ok(Vec::new())
        }

        async fn notifications(&self, _user_id: UserId) -> Result<Vec<Notification>> {
            Ok(Vec::new())
        }

        async fn user(&self, user_id: UserId) -> Result<User> {
            Ok(user(user_id))
        }

        async fn users(&self) -> Result<Vec<User>> {
            Ok((1..=5).map(user).collect())
        }

        async fn user_posts(&self, user_id: UserId) -> Result<Vec<Post>> {
            Ok(vec![post(10, user_id, *self.likes.lock())])
        }

        async fn followers(&self, _user_id: UserId) -> Result<Vec<User>> {
            if self.fail_followers {
                Err(not_found("followers"))
            } else {
                Ok((1..=8).map(user).collect())
            }
        }

        async fn following(&self, user_id: UserId) -> Result<Vec<User>> {
            Ok(match user_id {
                1 => vec![user(2)],
                2 => vec![user(3)],
                _ => Vec::new(),
            })
        }

        async fn like_post(&self, post_id: PostId, _actor_id: UserId) -> Result<LikeResponse> {
            if self.fail_like {
                return Err(not_found(&format!("posts/{post_id}/like")));
            }
            let mut likes = self.likes.lock();
            *likes += 1;
            Ok(LikeResponse {
                status: "ok".to_string(),
                like_count: *likes,
            })
        }

        async fn graph(&self) -> Result<Graph> {
            Ok(Graph::default())
        }

        async fn advance_simulation(&self, _steps: u32) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_derives_connection_sets_and_labels() {
        let mut view = ProfileView::new(Roster::new(), 1, 2);
        let report = view.load().await;
        assert!(report.is_complete());

        let ids = |users: &[User]| users.iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids(&view.connection_list(ConnectionView::Following)), [3]);
        assert_eq!(
            ids(&view.connection_list(ConnectionView::NotFollowing)),
            [1, 4, 5]
        );
        assert_eq!(view.sidebar_followers().len(), 6);

        let labels: Vec<RelationshipLabel> =
            view.labeled_posts().iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, [RelationshipLabel::Following]);
    }

    #[tokio::test]
    async fn own_profile_posts_are_labeled_self() {
        let mut view = ProfileView::new(Roster::new(), 1, 1);
        view.load().await;
        assert_eq!(view.labeled_posts()[0].0, RelationshipLabel::SelfAuthored);
    }

    #[tokio::test]
    async fn failed_read_keeps_previous_value() {
        let mut view = ProfileView::new(Roster::new(), 1, 2);
        view.load().await;
        assert_eq!(view.data().followers.len(), 8);

        view.backend.fail_followers = true;
        let report = view.load().await;
        assert_eq!(report.followers, SideChannel::Failed(ErrorKind::Status));
        assert_eq!(report.following, SideChannel::Applied(1));
        assert!(!report.is_complete());
        assert_eq!(view.data().followers.len(), 8);
    }

    #[tokio::test]
    async fn like_rereads_posts_only() {
        let mut view = ProfileView::new(Roster::new(), 1, 2);
        view.load().await;
        let before = view.data().clone();

        let like = view.like_post(10).await.unwrap();
        assert_eq!(like.like_count, 1);
        assert_eq!(view.posts()[0].like_count, 1);
        assert_eq!(view.data().followers, before.followers);
        assert_eq!(view.data().all_users, before.all_users);
    }

    #[tokio::test]
    async fn failed_like_changes_nothing() {
        let mut backend = Roster::new();
        backend.fail_like = true;
        let mut view = ProfileView::new(backend, 1, 2);
        view.load().await;
        let before = view.data().clone();

        let err = view.like_post(10).await.unwrap_err();
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(*view.data(), before);
    }
}
