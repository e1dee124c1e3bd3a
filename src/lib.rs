//! feedview - client orchestration for a ranked social feed
//!
//! This library turns adjustable ranking preferences into backend requests,
//! reconciles the feed, trend and notification responses into one view model,
//! and derives the follow-graph and relationship views from flat API data.
//!
//! # Modules
//!
//! - [`backend`] - Request/response boundary to the ranking service
//! - [`session`] - Feed refreshes with latest-wins sequencing
//! - [`preferences`] - Ranking weights and request parameters
//! - [`explain`] - Display rows for ranking explanations
//! - [`graph`] - Follow-graph adjacency index
//! - [`connections`] - Following / not-following sets and post labels
//! - [`profile`] - Subject profile loader
//! - [`error`] - Custom error types with rich context

pub mod backend;
pub mod cli;
pub mod config;
pub mod connections;
pub mod error;
pub mod explain;
pub mod graph;
pub mod logging;
pub mod model;
pub mod preferences;
pub mod profile;
pub mod session;

pub use backend::{DEFAULT_API_URL, FeedBackend, HttpBackend};
pub use cli::*;
pub use config::{Config, DEFAULT_VIEWER_ID};
pub use connections::{ConnectionSets, ConnectionView, RelationshipLabel};
pub use error::{
    ErrorKind, FeedError, Result, ResultExt, VALID_CONFIG_KEYS, find_closest_match,
    format_did_you_mean, format_error, format_unknown_value_error,
};
pub use explain::{ExplanationView, format_explanation};
pub use graph::{AdjacencyIndex, MemoizedIndex, build_index};
pub use model::*;
pub use preferences::{PreferenceKey, PreferenceStore, Preferences, RequestParams};
pub use profile::ProfileView;
pub use session::{FeedSession, FeedSnapshot, RefreshOutcome};

use chrono::{DateTime, Datelike, Utc};

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

/// Standard width for major header dividers in CLI output
pub const HEADER_DIVIDER_WIDTH: usize = 70;

/// Format an integer with thousands separators.
#[must_use]
pub fn format_number(value: i64) -> String {
    let abs = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(abs.len() + abs.len() / 3);

    for (idx, ch) in abs.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut formatted: String = out.chars().rev().collect();
    if value < 0 {
        formatted.insert(0, '-');
    }
    formatted
}

/// Post timestamp as `YYYY-MM-DD HH:MM` (UTC).
#[must_use]
pub fn format_post_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Trend score rounded to a whole number.
#[must_use]
pub fn format_trend_score(score: f64) -> String {
    explain::format_decimal(score, 0)
}

/// Format a datetime as a human-friendly relative string.
///
/// - < 1 minute: "just now"
/// - < 1 hour: "Nm ago"
/// - < 24 hours: "Nh ago"
/// - < 7 days: "Nd ago"
/// - Same calendar year: "Mon D"
/// - Different year: "Mon D, YYYY"
#[must_use]
pub fn format_relative_date(dt: DateTime<Utc>) -> String {
    format_relative_date_with_base(dt, Utc::now())
}

/// Format a datetime relative to a fixed base time (useful for tests).
#[must_use]
pub fn format_relative_date_with_base(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(dt);

    // Backend and client clocks can disagree by a little.
    if duration.num_seconds() < 0 {
        return dt.format("%b %d, %Y").to_string();
    }

    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if dt.year() == now.year() {
        dt.format("%b %d").to_string()
    } else {
        dt.format("%b %d, %Y").to_string()
    }
}

/// Shorten `text` to at most `max_chars` characters, ending in `...`.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn format_number_adds_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(-12_345), "-12,345");
    }

    #[test]
    fn post_dates_are_minute_precision_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 59).unwrap();
        assert_eq!(format_post_date(dt), "2024-03-09 07:05");
    }

    #[test]
    fn trend_scores_have_no_decimals() {
        assert_eq!(format_trend_score(41.6), "42");
        assert_eq!(format_trend_score(3.0), "3");
    }

    #[test]
    fn format_relative_date_thresholds() {
        let base = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();

        assert_eq!(
            format_relative_date_with_base(base - Duration::seconds(30), base),
            "just now"
        );
        assert_eq!(
            format_relative_date_with_base(base - Duration::minutes(5), base),
            "5m ago"
        );
        assert_eq!(
            format_relative_date_with_base(base - Duration::days(2), base),
            "2d ago"
        );

        let other_year = Utc.with_ymd_and_hms(2024, 12, 11, 0, 0, 0).unwrap();
        assert_eq!(
            format_relative_date_with_base(other_year, base),
            "Dec 11, 2024"
        );
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }
}
