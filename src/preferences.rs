//! Tunable ranking preferences.
//!
//! [`PreferenceStore`] owns the six weights and publishes every change on a
//! `tokio::sync::watch` channel. Consumers subscribe and derive request
//! parameters from the published value, so a refresh is driven by an actual
//! change rather than by re-rendering.

use crate::error::{FeedError, Result};
use crate::model::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

/// One of the six tunable weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    RecencyPopularity,
    FriendsGlobal,
    NicheViral,
    TopicTech,
    TopicPolitics,
    TopicCulture,
}

impl PreferenceKey {
    /// All keys, in request parameter order.
    pub const ALL: [Self; 6] = [
        Self::RecencyPopularity,
        Self::FriendsGlobal,
        Self::NicheViral,
        Self::TopicTech,
        Self::TopicPolitics,
        Self::TopicCulture,
    ];

    /// Wire name, used verbatim as the query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RecencyPopularity => "recency_popularity",
            Self::FriendsGlobal => "friends_global",
            Self::NicheViral => "niche_viral",
            Self::TopicTech => "topic_tech",
            Self::TopicPolitics => "topic_politics",
            Self::TopicCulture => "topic_culture",
        }
    }

    /// Slider label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RecencyPopularity => "Recency vs Popularity",
            Self::FriendsGlobal => "Friends vs Global",
            Self::NicheViral => "Niche vs Viral",
            Self::TopicTech => "Tech Focus",
            Self::TopicPolitics => "Politics Focus",
            Self::TopicCulture => "Culture Focus",
        }
    }

    /// Wire names of every key.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl std::fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PreferenceKey {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| FeedError::unknown_preference(s))
    }
}

/// The six ranking weights. Every field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub recency_popularity: f64,
    pub friends_global: f64,
    pub niche_viral: f64,
    pub topic_tech: f64,
    pub topic_politics: f64,
    pub topic_culture: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            recency_popularity: 0.6,
            friends_global: 0.5,
            niche_viral: 0.5,
            topic_tech: 0.6,
            topic_politics: 0.3,
            topic_culture: 0.4,
        }
    }
}

/// Clamp a weight into `[0, 1]`. `NaN` has no position on a slider and
/// yields `None`.
#[must_use]
pub fn clamp_weight(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

impl Preferences {
    /// Current value of one weight.
    #[must_use]
    pub const fn get(&self, key: PreferenceKey) -> f64 {
        match key {
            PreferenceKey::RecencyPopularity => self.recency_popularity,
            PreferenceKey::FriendsGlobal => self.friends_global,
            PreferenceKey::NicheViral => self.niche_viral,
            PreferenceKey::TopicTech => self.topic_tech,
            PreferenceKey::TopicPolitics => self.topic_politics,
            PreferenceKey::TopicCulture => self.topic_culture,
        }
    }

    fn slot(&mut self, key: PreferenceKey) -> &mut f64 {
        match key {
            PreferenceKey::RecencyPopularity => &mut self.recency_popularity,
            PreferenceKey::FriendsGlobal => &mut self.friends_global,
            PreferenceKey::NicheViral => &mut self.niche_viral,
            PreferenceKey::TopicTech => &mut self.topic_tech,
            PreferenceKey::TopicPolitics => &mut self.topic_politics,
            PreferenceKey::TopicCulture => &mut self.topic_culture,
        }
    }

    /// Set one weight, clamped. Returns whether the stored value changed.
    pub fn set(&mut self, key: PreferenceKey, value: f64) -> bool {
        let Some(clamped) = clamp_weight(value) else {
            warn!(key = %key, "Ignoring NaN preference value");
            return false;
        };
        if clamped != value {
            debug!(key = %key, requested = value, stored = clamped, "Clamped preference");
        }
        let slot = self.slot(key);
        if (*slot - clamped).abs() < f64::EPSILON {
            return false;
        }
        *slot = clamped;
        true
    }

    /// Re-establish the `[0, 1]` invariant on every field, e.g. after
    /// deserializing from a config file. `NaN` falls back to the default.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for key in PreferenceKey::ALL {
            let value = clamp_weight(self.get(key)).unwrap_or_else(|| defaults.get(key));
            *self.slot(key) = value;
        }
        self
    }

    /// Iterate `(key, value)` pairs in request parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (PreferenceKey, f64)> + '_ {
        PreferenceKey::ALL.into_iter().map(|k| (k, self.get(k)))
    }
}

/// Parse a `key=value` override, e.g. from `--set topic_tech=0.9`.
///
/// # Errors
///
/// Returns [`FeedError::UnknownPreference`] for an unknown key and
/// [`FeedError::InvalidPreferenceValue`] when the value is not a number.
pub fn parse_assignment(raw: &str) -> Result<(PreferenceKey, f64)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| FeedError::InvalidPreferenceValue {
            key: raw.to_string(),
            value: String::new(),
        })?;
    let key: PreferenceKey = key.parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| FeedError::InvalidPreferenceValue {
            key: key.to_string(),
            value: value.to_string(),
        })?;
    Ok((key, value))
}

/// Query parameters for the ranked feed request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RequestParams {
    pub user_id: UserId,
    #[serde(flatten)]
    pub preferences: Preferences,
}

impl RequestParams {
    #[must_use]
    pub const fn new(user_id: UserId, preferences: Preferences) -> Self {
        Self {
            user_id,
            preferences,
        }
    }

    /// Flatten into `(name, value)` string pairs, `user_id` first.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        pairs.push(("user_id", self.user_id.to_string()));
        for (key, value) in self.preferences.iter() {
            pairs.push((key.as_str(), value.to_string()));
        }
        pairs
    }
}

/// Holds the current [`Preferences`] and notifies subscribers on change.
#[derive(Debug)]
pub struct PreferenceStore {
    viewer_id: UserId,
    tx: watch::Sender<Preferences>,
}

impl PreferenceStore {
    /// Store for `viewer_id`, starting from the built-in defaults.
    #[must_use]
    pub fn new(viewer_id: UserId) -> Self {
        Self::with_preferences(viewer_id, Preferences::default())
    }

    /// Store for `viewer_id`, starting from `initial` (clamped).
    #[must_use]
    pub fn with_preferences(viewer_id: UserId, initial: Preferences) -> Self {
        let (tx, _rx) = watch::channel(initial.sanitized());
        Self { viewer_id, tx }
    }

    #[must_use]
    pub const fn viewer_id(&self) -> UserId {
        self.viewer_id
    }

    /// Snapshot of the current weights.
    #[must_use]
    pub fn current(&self) -> Preferences {
        *self.tx.borrow()
    }

    /// Replace one weight. Out-of-range input is clamped into `[0, 1]`;
    /// `NaN` is ignored. Subscribers are notified only when the stored value
    /// actually changes.
    pub fn set_value(&self, key: PreferenceKey, value: f64) -> bool {
        self.tx.send_if_modified(|prefs| prefs.set(key, value))
    }

    /// Parameters for the feed request, built from the current weights.
    #[must_use]
    pub fn to_request_params(&self) -> RequestParams {
        RequestParams::new(self.viewer_id, self.current())
    }

    /// Subscribe to changes. The receiver starts with the current value
    /// marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }
}
