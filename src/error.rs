//! Error types for feedview.
//!
//! Every read against the backend collapses to "leave the view stale" in the
//! default presentation, but the error itself still carries enough structure
//! to tell a dead transport from a 5xx or a malformed body.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for feedview operations.
#[derive(Error, Debug)]
pub enum FeedError {
    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The request never produced an HTTP status (connection refused, reset, ...).
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The body did not match the declared response shape.
    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The configured backend URL cannot be used.
    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // =========================================================================
    // Preference Errors
    // =========================================================================
    /// A preference key that does not exist.
    #[error("Unknown preference '{key}'")]
    UnknownPreference { key: String },

    /// A preference value that is not a number.
    #[error("Invalid value '{value}' for preference '{key}'")]
    InvalidPreferenceValue { key: String, value: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file or key error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// Environment variable error.
    #[error("Invalid environment variable {var}: {reason}")]
    EnvVarError { var: String, reason: String },

    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for feedview operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Coarse classification of a [`FeedError`], for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network unreachable, connection reset, timeout at the socket.
    Transport,
    /// Non-2xx answer.
    Status,
    /// Body did not decode into the declared shape.
    Decode,
    /// Bad user input (preference keys, values, URLs).
    Input,
    /// Configuration or environment problem.
    Config,
    /// Anything else.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Status => write!(f, "status"),
            Self::Decode => write!(f, "decode"),
            Self::Input => write!(f, "input"),
            Self::Config => write!(f, "config"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl FeedError {
    /// Classify a reqwest error raised while talking to `endpoint`.
    pub fn from_reqwest(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if source.is_decode() {
            return Self::Decode {
                endpoint,
                reason: source.to_string(),
            };
        }
        if let Some(status) = source.status() {
            return Self::Status {
                endpoint,
                status: status.as_u16(),
                body: String::new(),
            };
        }
        Self::Transport { endpoint, source }
    }

    /// Create a non-2xx status error.
    pub fn status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown preference error.
    pub fn unknown_preference(key: impl Into<String>) -> Self {
        Self::UnknownPreference { key: key.into() }
    }

    /// Create a configuration error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// An environment variable holding a value that does not parse.
    pub fn env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVarError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::InvalidUrl { .. }
            | Self::UnknownPreference { .. }
            | Self::InvalidPreferenceValue { .. } => ErrorKind::Input,
            Self::ConfigError { .. } | Self::EnvVarError { .. } => ErrorKind::Config,
            Self::IoError(_) | Self::WithContext { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status carried by this error, if the backend answered at all.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is recoverable (user can fix it).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::UnknownPreference { .. }
                | Self::InvalidPreferenceValue { .. }
                | Self::ConfigError { .. }
                | Self::EnvVarError { .. }
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Transport { .. } => {
                Some("Is the backend running? Check --api-url or FEEDVIEW_API_URL.")
            }
            Self::InvalidUrl { .. } => Some("Use a full URL such as http://localhost:8000."),
            Self::UnknownPreference { .. } => Some(
                "Valid preferences: recency_popularity, friends_global, niche_viral, topic_tech, topic_politics, topic_culture.",
            ),
            Self::InvalidPreferenceValue { .. } => {
                Some("Preference values are numbers between 0 and 1.")
            }
            Self::ConfigError { .. } => Some("Run 'feedview config --init' to write a fresh config."),
            Self::EnvVarError { .. } => Some("Fix or unset the variable and try again."),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FeedError::with_context(context, e))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FeedError::with_context(f(), e))
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Format a [`FeedError`] for the terminal, including its suggestion.
#[must_use]
pub fn format_feed_error(err: &FeedError) -> String {
    let title = format!("{} error", err.kind());
    let explanation = err.to_string();
    match err.suggestion() {
        Some(hint) => format_error(&title, &explanation, &[hint]),
        None => format_error(&title, &explanation, &[]),
    }
}

/// Calculate the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the best match from a list of candidates for a given input.
///
/// Exact matches are not suggestions and return `None`.
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let max_dist = max_distance.unwrap_or(3);
    let input_lower = input.to_lowercase();

    candidates
        .iter()
        .map(|&candidate| {
            let candidate_lower = candidate.to_lowercase();
            let distance = levenshtein_distance(&input_lower, &candidate_lower);
            (candidate, distance)
        })
        .filter(|(_, distance)| *distance <= max_dist && *distance > 0)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '{}'?", suggestion.green())
}

/// Format an error for an unknown value with "did you mean?" support.
#[must_use]
pub fn format_unknown_value_error(kind: &str, input: &str, valid_options: &[&str]) -> String {
    let title = format!("Unknown {kind}: '{input}'");

    let mut suggestions = Vec::new();

    if let Some(closest) = find_closest_match(input, valid_options, None) {
        suggestions.push(format_did_you_mean(closest));
    }

    if valid_options.len() <= 8 {
        suggestions.push(format!("Valid {kind}s: {}", valid_options.join(", ")));
    }

    let suggestion_refs: Vec<&str> = suggestions.iter().map(String::as_str).collect();
    format_error(&title, "", &suggestion_refs)
}

/// Valid keys for `feedview config --set`.
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api.base_url",
    "api.viewer_id",
    "feed.notification_limit",
    "feed.recency_popularity",
    "feed.friends_global",
    "feed.niche_viral",
    "feed.topic_tech",
    "feed.topic_politics",
    "feed.topic_culture",
    "output.format",
    "output.colors",
];
