//! Data models for the feed backend.
//!
//! These structures mirror the JSON shapes the ranking backend returns. They
//! are decoded at the boundary with serde, so a body that does not match its
//! declared shape fails as a decode error instead of leaking into view state.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a user (and of a graph node).
pub type UserId = i64;

/// Identifier of a post.
pub type PostId = i64;

/// Identifier of a notification.
pub type NotificationId = i64;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    pub persona_type: String,
}

/// A post as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: User,
    pub content: String,
    pub topic: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub reply_count: i64,
    pub repost_count: i64,
    pub quote_count: i64,
    pub is_reply: bool,
    pub reply_to_id: Option<PostId>,
}

/// Upstream breakdown of why an item was ranked where it was.
///
/// Produced by the ranking service and rendered verbatim; nothing here is
/// computed client-side. The maps keep the keys in response order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub score: f64,
    #[serde(default)]
    pub components: IndexMap<String, f64>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub stage_log: Vec<String>,
    #[serde(default)]
    pub action_probs: IndexMap<String, f64>,
}

impl Explanation {
    /// Whether the `in_network` signal marks the author as followed.
    #[must_use]
    pub fn is_in_network(&self) -> bool {
        self.components
            .get(crate::explain::IN_NETWORK_KEY)
            .is_some_and(|v| *v > crate::explain::IN_NETWORK_THRESHOLD)
    }
}

/// A ranked post together with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: Post,
    pub explanation: Explanation,
}

/// Response of the ranked feed endpoint. `items` is in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
    #[serde(with = "timestamp")]
    pub generated_at: DateTime<Utc>,
}

/// A trending topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub topic: String,
    pub score: f64,
}

/// A notification addressed to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// A node of the follow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: UserId,
    pub handle: String,
    pub persona_type: String,
}

/// A directed follow edge: `source` follows `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: UserId,
    pub target: UserId,
}

/// The whole follow graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Acknowledgement of a like action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub status: String,
    pub like_count: i64,
}

/// Timestamp codec accepting RFC 3339 as well as offset-less ISO 8601.
///
/// The backend serializes naive UTC datetimes (no offset); those are read as
/// UTC. Output is always RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parse a backend timestamp.
    #[must_use]
    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
