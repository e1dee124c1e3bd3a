//! CLI definitions for feedview.
//!
//! Uses clap for argument parsing with derive macros.

use crate::connections::ConnectionView;
use crate::logging::{LogFormat, LogLevel};
use crate::model::{PostId, UserId};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// feedview - inspect a ranked social feed from the terminal
#[derive(Parser, Debug)]
#[command(name = "feedview")]
#[command(version)]
#[command(about = "Terminal client for a ranked social feed backend")]
#[command(long_about = r#"
feedview talks to a feed ranking backend and renders what it returns:
the ranked feed with per-item explanations, trends, notifications,
profiles with following / not-following lists, and the follow graph.

Ranking weights (all between 0 and 1):
  recency_popularity, friends_global, niche_viral,
  topic_tech, topic_politics, topic_culture

Quick start:
  1. Start the backend on http://localhost:8000
  2. Run: feedview feed
  3. Tune: feedview feed --set topic_tech=0.9 --set niche_viral=0.2
"#)]
pub struct Cli {
    /// Base URL of the ranking backend
    #[arg(long, env = "FEEDVIEW_API_URL", global = true)]
    pub api_url: Option<String>,

    /// User id to act as
    #[arg(long, env = "FEEDVIEW_VIEWER_ID", global = true)]
    pub viewer: Option<UserId>,

    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Be verbose (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level for diagnostics on stderr (overrides -v/-q)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log layout: pretty, compact or full
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and show the ranked feed, trends and notifications
    Feed(FeedArgs),

    /// Show the request parameters the feed would be fetched with
    Params(ParamsArgs),

    /// Show trending topics
    Trends,

    /// Show the viewer's latest notifications
    Notifications,

    /// List users someone follows (default: the viewer)
    Following(UserArgs),

    /// List someone's followers (default: the viewer)
    Followers(UserArgs),

    /// Show a user's profile, posts and connections
    Profile(ProfileArgs),

    /// Show the follow graph
    Graph,

    /// Like a post as the viewer, then refresh the feed
    Like(LikeArgs),

    /// Advance the backend simulation
    Simulate(SimulateArgs),

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct PreferenceOverrides {
    /// Override a ranking weight, e.g. --set topic_tech=0.9 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    #[command(flatten)]
    pub overrides: PreferenceOverrides,

    /// Show the ranking explanation for each item (default)
    #[arg(long, overrides_with = "no_explain")]
    pub explain: bool,

    /// Hide ranking explanations
    #[arg(long, overrides_with = "explain")]
    pub no_explain: bool,
}

impl FeedArgs {
    /// Whether explanations should be rendered.
    #[must_use]
    pub const fn show_explanations(&self) -> bool {
        self.explain || !self.no_explain
    }
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub overrides: PreferenceOverrides,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// User id (defaults to the viewer)
    pub user: Option<UserId>,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// User id of the profile to show
    pub user: UserId,

    /// Which connection list to show
    #[arg(long, default_value = "following")]
    pub view: ConnectionView,
}

#[derive(Args, Debug)]
pub struct LikeArgs {
    /// Post id to like
    pub post: PostId,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of simulation steps
    #[arg(long, short = 'n', default_value = "1")]
    pub steps: u32,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Set a configuration value (KEY=VALUE, e.g. feed.topic_tech=0.8)
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Option<String>,

    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    /// Parse a configured format name; unknown names fall back to text.
    #[must_use]
    pub fn from_config(name: &str) -> Self {
        <Self as ValueEnum>::from_str(name, true).unwrap_or_default()
    }
}
