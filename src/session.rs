//! Feed session: turns request parameters into a consistent view model.
//!
//! A refresh fetches the ranked feed, then trends and notifications
//! concurrently. Every refresh is tagged with a monotonically increasing
//! sequence number; a response is applied only while its refresh is still
//! the most recently issued one, so a slow earlier response can never
//! overwrite the result of a later refresh. There is no cancellation at the
//! backend boundary: superseded responses are simply dropped on arrival.
//!
//! Failed reads leave the previously held data untouched. The loading flag
//! is cleared when the latest refresh finishes, whatever its outcome,
//! including when its future is dropped mid-flight.

use crate::backend::FeedBackend;
use crate::error::{ErrorKind, FeedError, Result};
use crate::logging::OperationGuard;
use crate::model::{FeedItem, LikeResponse, Notification, PostId, Trend, UserId};
use crate::preferences::{Preferences, RequestParams};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Notifications kept after a refresh.
pub const DEFAULT_NOTIFICATION_LIMIT: usize = 6;

/// Everything a feed view renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedSnapshot {
    /// Ranked items, in backend rank order.
    pub items: Vec<FeedItem>,
    /// When the backend produced `items`.
    pub generated_at: Option<DateTime<Utc>>,
    pub trends: Vec<Trend>,
    /// Stable prefix of the viewer's notifications.
    pub notifications: Vec<Notification>,
    /// True while the most recently issued refresh is in flight.
    pub loading: bool,
    /// Parameters of the most recently issued refresh.
    pub last_params: Option<RequestParams>,
    /// Sequence number of the refresh whose feed is currently shown (0 = none).
    pub applied_seq: u64,
}

/// Result of one side-channel fetch within a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideChannel {
    /// Applied; carries the number of entries now held.
    Applied(usize),
    /// The request failed; previous data kept.
    Failed(ErrorKind),
    /// A newer refresh was issued before the response arrived.
    Superseded,
}

/// What a refresh did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The feed response was applied.
    Applied {
        seq: u64,
        items: usize,
        trends: SideChannel,
        notifications: SideChannel,
    },
    /// A newer refresh was issued first; the response was discarded.
    Superseded { seq: u64, latest: u64 },
}

impl RefreshOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Owns the feed, trend and notification collections for one viewer.
pub struct FeedSession<B> {
    backend: B,
    viewer_id: UserId,
    notification_limit: usize,
    default_preferences: Preferences,
    issued: AtomicU64,
    state: Mutex<FeedSnapshot>,
}

impl<B: FeedBackend> FeedSession<B> {
    /// Empty session for `viewer_id`.
    pub fn new(backend: B, viewer_id: UserId) -> Self {
        Self {
            backend,
            viewer_id,
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
            default_preferences: Preferences::default(),
            issued: AtomicU64::new(0),
            state: Mutex::new(FeedSnapshot::default()),
        }
    }

    /// Keep at most `limit` notifications after each refresh.
    #[must_use]
    pub fn with_notification_limit(mut self, limit: usize) -> Self {
        self.notification_limit = limit;
        self
    }

    /// Weights used by [`Self::like_post`] when nothing has been refreshed yet.
    #[must_use]
    pub fn with_default_preferences(mut self, preferences: Preferences) -> Self {
        self.default_preferences = preferences.sanitized();
        self
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn viewer_id(&self) -> UserId {
        self.viewer_id
    }

    /// Copy of the current view model.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Parameters of the most recently issued refresh.
    pub fn last_params(&self) -> Option<RequestParams> {
        self.state.lock().last_params
    }

    /// Sequence number of the most recently issued refresh.
    pub fn latest_seq(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.latest_seq() == seq
    }

    /// Fetch the feed for `params`, then trends and notifications.
    ///
    /// # Errors
    ///
    /// Returns the feed request's error. Held data is left untouched in that
    /// case; trends and notifications are not fetched. Side-channel failures
    /// are reported in the outcome, not as an error.
    pub async fn refresh(&self, params: RequestParams) -> Result<RefreshOutcome> {
        let seq = self.begin(params);
        let _loading = LoadingGuard { session: self, seq };
        let op = OperationGuard::new("feed refresh");

        let response = match self.backend.feed(&params).await {
            Ok(response) => response,
            Err(err) => {
                warn!(seq, kind = %err.kind(), error = %err, "Feed request failed; keeping previous items");
                op.fail(&err);
                return Err(err);
            }
        };

        let items = response.items.len();
        {
            let mut state = self.state.lock();
            if !self.is_latest(seq) {
                let latest = self.latest_seq();
                debug!(seq, latest, "Discarding superseded feed response");
                op.complete();
                return Ok(RefreshOutcome::Superseded { seq, latest });
            }
            state.items = response.items;
            state.generated_at = Some(response.generated_at);
            state.applied_seq = seq;
        }

        let (trends, notifications) = tokio::join!(
            self.backend.trends(),
            self.backend.notifications(params.user_id)
        );
        let trends = self.apply_trends(seq, trends);
        let notifications = self.apply_notifications(seq, notifications);

        info!(seq, items, ?trends, ?notifications, "Feed refreshed");
        op.complete();
        Ok(RefreshOutcome::Applied {
            seq,
            items,
            trends,
            notifications,
        })
    }

    /// Like `post_id` as the viewer, then refresh with the last used
    /// parameters (the session's default preferences if it has never
    /// refreshed).
    ///
    /// A failed refresh after a successful like is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns the like request's error; no state changes and nothing is
    /// retried in that case.
    pub async fn like_post(&self, post_id: PostId) -> Result<LikeResponse> {
        let like = self
            .backend
            .like_post(post_id, self.viewer_id)
            .await
            .inspect_err(|err| {
                warn!(post_id, kind = %err.kind(), error = %err, "Like failed");
            })?;
        debug!(post_id, like_count = like.like_count, "Liked post");

        let params = self
            .last_params()
            .unwrap_or_else(|| RequestParams::new(self.viewer_id, self.default_preferences));
        if let Err(err) = self.refresh(params).await {
            warn!(post_id, error = %err, "Refresh after like failed");
        }
        Ok(like)
    }

    /// Refresh now and again every time the preferences change, until the
    /// owning store is dropped. Bursts of changes made while a refresh is in
    /// flight coalesce into one refresh with the newest values.
    pub async fn follow_preferences(&self, mut preferences: watch::Receiver<Preferences>) {
        loop {
            let current = *preferences.borrow_and_update();
            let params = RequestParams::new(self.viewer_id, current);
            if let Err(err) = self.refresh(params).await {
                debug!(error = %err, "Preference-driven refresh failed");
            }
            if preferences.changed().await.is_err() {
                debug!("Preference store dropped; stopping refresh loop");
                return;
            }
        }
    }

    fn begin(&self, params: RequestParams) -> u64 {
        let mut state = self.state.lock();
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        state.loading = true;
        state.last_params = Some(params);
        debug!(seq, "Issued feed refresh");
        seq
    }

    fn apply_trends(&self, seq: u64, result: Result<Vec<Trend>>) -> SideChannel {
        match result {
            Ok(trends) => {
                let mut state = self.state.lock();
                if !self.is_latest(seq) {
                    return SideChannel::Superseded;
                }
                state.trends = trends;
                SideChannel::Applied(state.trends.len())
            }
            Err(err) => Self::side_channel_failed("trends", &err),
        }
    }

    fn apply_notifications(&self, seq: u64, result: Result<Vec<Notification>>) -> SideChannel {
        match result {
            Ok(mut notifications) => {
                notifications.truncate(self.notification_limit);
                let mut state = self.state.lock();
                if !self.is_latest(seq) {
                    return SideChannel::Superseded;
                }
                state.notifications = notifications;
                SideChannel::Applied(state.notifications.len())
            }
            Err(err) => Self::side_channel_failed("notifications", &err),
        }
    }

    fn side_channel_failed(channel: &'static str, err: &FeedError) -> SideChannel {
        warn!(channel, kind = %err.kind(), error = %err, "Side-channel request failed; keeping previous data");
        SideChannel::Failed(err.kind())
    }
}

/// Clears the loading flag when the refresh that owns it ends, if that
/// refresh is still the latest.
struct LoadingGuard<'a, B> {
    session: &'a FeedSession<B>,
    seq: u64,
}

impl<B> Drop for LoadingGuard<'_, B> {
    fn drop(&mut self) {
        let mut state = self.session.state.lock();
        if self.session.issued.load(Ordering::SeqCst) == self.seq {
            state.loading = false;
        }
    }
}
