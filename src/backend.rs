//! Request/response boundary to the ranking backend.
//!
//! [`FeedBackend`] is the seam every view talks through; [`HttpBackend`] is
//! the production implementation over reqwest. Responses are decoded into
//! the typed models of [`crate::model`], so a body that does not match its
//! declared shape surfaces as [`FeedError::Decode`].
//!
//! No request timeout is configured. A request that never completes keeps
//! the view that depends on it stale.

use crate::error::{FeedError, Result};
use crate::model::{
    FeedResponse, Graph, LikeResponse, Notification, Post, PostId, Trend, User, UserId,
};
use crate::preferences::RequestParams;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Default backend location.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Every backend operation this client consumes.
#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// Ranked feed for `params`.
    async fn feed(&self, params: &RequestParams) -> Result<FeedResponse>;

    /// Trending topics.
    async fn trends(&self) -> Result<Vec<Trend>>;

    /// Notifications addressed to `user_id`, newest first.
    async fn notifications(&self, user_id: UserId) -> Result<Vec<Notification>>;

    /// A single user.
    async fn user(&self, user_id: UserId) -> Result<User>;

    /// Every user.
    async fn users(&self) -> Result<Vec<User>>;

    /// Posts authored by `user_id`.
    async fn user_posts(&self, user_id: UserId) -> Result<Vec<Post>>;

    /// Users following `user_id`.
    async fn followers(&self, user_id: UserId) -> Result<Vec<User>>;

    /// Users `user_id` follows.
    async fn following(&self, user_id: UserId) -> Result<Vec<User>>;

    /// Like `post_id` as `actor_id`. Any non-2xx answer is a failure.
    async fn like_post(&self, post_id: PostId, actor_id: UserId) -> Result<LikeResponse>;

    /// The whole follow graph.
    async fn graph(&self) -> Result<Graph>;

    /// Advance the backend simulation. Fire-and-forget: neither the status
    /// nor the body of the answer is looked at; only transport failures
    /// are returned.
    async fn advance_simulation(&self, steps: u32) -> Result<()>;
}

#[async_trait]
impl<T: FeedBackend + ?Sized> FeedBackend for std::sync::Arc<T> {
    async fn feed(&self, params: &RequestParams) -> Result<FeedResponse> {
        (**self).feed(params).await
    }

    async fn trends(&self) -> Result<Vec<Trend>> {
        (**self).trends().await
    }

    async fn notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        (**self).notifications(user_id).await
    }

    async fn user(&self, user_id: UserId) -> Result<User> {
        (**self).user(user_id).await
    }

    async fn users(&self) -> Result<Vec<User>> {
        (**self).users().await
    }

    async fn user_posts(&self, user_id: UserId) -> Result<Vec<Post>> {
        (**self).user_posts(user_id).await
    }

    async fn followers(&self, user_id: UserId) -> Result<Vec<User>> {
        (**self).followers(user_id).await
    }

    async fn following(&self, user_id: UserId) -> Result<Vec<User>> {
        (**self).following(user_id).await
    }

    async fn like_post(&self, post_id: PostId, actor_id: UserId) -> Result<LikeResponse> {
        (**self).like_post(post_id, actor_id).await
    }

    async fn graph(&self) -> Result<Graph> {
        (**self).graph().await
    }

    async fn advance_simulation(&self, steps: u32) -> Result<()> {
        (**self).advance_simulation(steps).await
    }
}

/// [`FeedBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// Backend rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if `base_url` does not parse or
    /// cannot be a base, and [`FeedError::Transport`] if the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| FeedError::from_reqwest("client", e))?;
        Self::with_client(base_url, client)
    }

    /// Backend rooted at `base_url` using a preconfigured client.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if `base_url` is unusable.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let invalid = |reason: String| FeedError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot be a base".to_string()));
        }
        // Joining relative paths drops the last segment unless it ends in '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            client,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FeedError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        trace!(%url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(path, e))?;
        Self::decode(path, response).await
    }

    /// POST without looking at the answer's status.
    async fn send_post(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.endpoint(path)?;
        trace!(%url, "POST");
        self.client
            .post(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(path, e))
    }

    async fn post(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let response = self.send_post(path, query).await?;
        Self::ensure_success(path, response).await
    }

    async fn ensure_success(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(endpoint = path, status = status.as_u16(), "Backend returned error status");
        Err(FeedError::status(path, status.as_u16(), body))
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let response = Self::ensure_success(path, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::from_reqwest(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| FeedError::decode(path, e.to_string()))
    }
}

const NO_QUERY: &[(&str, &str)] = &[];

#[async_trait]
impl FeedBackend for HttpBackend {
    async fn feed(&self, params: &RequestParams) -> Result<FeedResponse> {
        self.get_json("feed", &params.to_pairs()).await
    }

    async fn trends(&self) -> Result<Vec<Trend>> {
        self.get_json("trends", NO_QUERY).await
    }

    async fn notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.get_json("notifications", &[("user_id", user_id)]).await
    }

    async fn user(&self, user_id: UserId) -> Result<User> {
        self.get_json(&format!("users/{user_id}"), NO_QUERY).await
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.get_json("users", NO_QUERY).await
    }

    async fn user_posts(&self, user_id: UserId) -> Result<Vec<Post>> {
        self.get_json(&format!("users/{user_id}/posts"), NO_QUERY)
            .await
    }

    async fn followers(&self, user_id: UserId) -> Result<Vec<User>> {
        self.get_json(&format!("users/{user_id}/followers"), NO_QUERY)
            .await
    }

    async fn following(&self, user_id: UserId) -> Result<Vec<User>> {
        self.get_json(&format!("users/{user_id}/following"), NO_QUERY)
            .await
    }

    async fn like_post(&self, post_id: PostId, actor_id: UserId) -> Result<LikeResponse> {
        let path = format!("posts/{post_id}/like");
        let response = self
            .post(&path, &[("user_id", actor_id.to_string())])
            .await?;
        Self::decode(&path, response).await
    }

    async fn graph(&self) -> Result<Graph> {
        self.get_json("graph", NO_QUERY).await
    }

    async fn advance_simulation(&self, steps: u32) -> Result<()> {
        let response = self
            .send_post("simulate/step", &[("steps", steps.to_string())])
            .await?;
        debug!(steps, status = response.status().as_u16(), "Simulation step sent");
        Ok(())
    }
}
