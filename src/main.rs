//! feedview - terminal client for a ranked social feed
//!
//! Main entry point for the feedview command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use serde::Serialize;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use feedview::error::format_feed_error;
use feedview::explain::ExplanationView;
use feedview::graph::graph_rows;
use feedview::logging::{LogConfig, init_logging};
use feedview::preferences::parse_assignment;
use feedview::*;

/// Bios in user listings are cut to this many characters.
const BIO_WIDTH: usize = 72;

/// An error whose message is already formatted for the terminal.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Reported(String);

/// Resolved settings shared by every command.
struct App {
    config: Config,
    format: OutputFormat,
    quiet: bool,
}

impl App {
    const fn viewer(&self) -> UserId {
        self.config.api.viewer_id
    }

    fn backend(&self) -> Result<HttpBackend> {
        Ok(HttpBackend::new(&self.config.api.base_url)?)
    }

    const fn is_text(&self) -> bool {
        matches!(self.format, OutputFormat::Text)
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_colors = std::env::var_os("NO_COLOR").is_none()
        && std::env::var_os("FEEDVIEW_NO_COLOR").is_none();
    let mut log = LogConfig::for_cli(cli.quiet, cli.verbose).with_colors(env_colors);
    if let Some(level) = cli.log_level {
        log.level = level;
    }
    if let Some(format) = cli.log_format {
        log.format = format;
    }
    init_logging(&log);

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", format_feed_error(&err));
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url.clone_from(url);
    }
    if let Some(viewer) = cli.viewer {
        config.api.viewer_id = viewer;
    }
    if !config.output.colors {
        colored::control::set_override(false);
    }

    let ctx = App {
        format: cli
            .format
            .unwrap_or_else(|| OutputFormat::from_config(&config.output.format)),
        quiet: cli.quiet,
        config,
    };

    match run(&cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, ctx: &App) -> Result<()> {
    match &cli.command {
        Commands::Feed(args) => cmd_feed(ctx, args).await,
        Commands::Params(args) => cmd_params(ctx, args),
        Commands::Trends => cmd_trends(ctx).await,
        Commands::Notifications => cmd_notifications(ctx).await,
        Commands::Following(args) => cmd_connections(ctx, args, false).await,
        Commands::Followers(args) => cmd_connections(ctx, args, true).await,
        Commands::Profile(args) => cmd_profile(ctx, args).await,
        Commands::Graph => cmd_graph(ctx).await,
        Commands::Like(args) => cmd_like(ctx, args).await,
        Commands::Simulate(args) => cmd_simulate(ctx, args).await,
        Commands::Config(args) => cmd_config(ctx, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn report_error(err: &anyhow::Error) {
    if let Some(reported) = err.downcast_ref::<Reported>() {
        eprintln!("{reported}");
    } else if let Some(feed_err) = err.downcast_ref::<FeedError>() {
        eprintln!("{}", format_feed_error(feed_err));
    } else {
        eprintln!("{}", format_error(&format!("{err:#}"), "", &[]));
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Build the preference store from config plus `--set` overrides.
///
/// Returns the store and the overrides that had to be clamped.
fn preference_store(
    ctx: &App,
    overrides: &PreferenceOverrides,
) -> Result<(PreferenceStore, Vec<(PreferenceKey, f64)>)> {
    let store = PreferenceStore::with_preferences(ctx.viewer(), ctx.config.preferences());
    let mut clamped = Vec::new();

    for raw in &overrides.set {
        let (key, value) = parse_assignment(raw).map_err(|err| match err {
            FeedError::UnknownPreference { key } => anyhow::Error::new(Reported(
                format_unknown_value_error("preference", &key, &PreferenceKey::names()),
            )),
            other => other.into(),
        })?;
        store.set_value(key, value);
        if (store.current().get(key) - value).abs() > f64::EPSILON && !value.is_nan() {
            clamped.push((key, value));
        }
    }
    Ok((store, clamped))
}

fn cmd_params(ctx: &App, args: &ParamsArgs) -> Result<()> {
    let (store, clamped) = preference_store(ctx, &args.overrides)?;
    let params = store.to_request_params();

    if !ctx.is_text() {
        return ctx.print_json(&params);
    }

    println!("{}", "Feed request parameters".bold().cyan());
    println!("  {:<20} {}", "user_id", params.user_id);
    for (key, value) in params.preferences.iter() {
        let note = clamped
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, requested)| format!(" (clamped from {requested})"))
            .unwrap_or_default();
        println!(
            "  {:<20} {}{}  {}",
            key.as_str(),
            value,
            note.yellow(),
            key.label().dimmed()
        );
    }
    Ok(())
}

// =============================================================================
// Feed
// =============================================================================

#[derive(Serialize)]
struct RenderedItem<'a> {
    relationship: RelationshipLabel,
    post: &'a Post,
    explanation: ExplanationView,
}

#[derive(Serialize)]
struct FeedOutput<'a> {
    params: Option<RequestParams>,
    generated_at: Option<chrono::DateTime<chrono::Utc>>,
    items: Vec<RenderedItem<'a>>,
    trends: &'a [Trend],
    notifications: &'a [Notification],
}

fn render_items(snapshot: &FeedSnapshot) -> Vec<RenderedItem<'_>> {
    snapshot
        .items
        .iter()
        .map(|item| RenderedItem {
            relationship: RelationshipLabel::from_in_network(item.explanation.is_in_network()),
            post: &item.post,
            explanation: format_explanation(&item.explanation),
        })
        .collect()
}

async fn cmd_feed(ctx: &App, args: &FeedArgs) -> Result<()> {
    let (store, _) = preference_store(ctx, &args.overrides)?;
    let session = FeedSession::new(ctx.backend()?, ctx.viewer())
        .with_notification_limit(ctx.config.feed.notification_limit);

    let result = session.refresh(store.to_request_params()).await;
    let snapshot = session.snapshot();
    print_feed(ctx, &snapshot, args.show_explanations())?;

    // The view above is whatever the session still holds; the exit status
    // reports the failure.
    result.map(|_| ()).map_err(Into::into)
}

fn print_feed(ctx: &App, snapshot: &FeedSnapshot, explain: bool) -> Result<()> {
    let items = render_items(snapshot);

    if !ctx.is_text() {
        return ctx.print_json(&FeedOutput {
            params: snapshot.last_params,
            generated_at: snapshot.generated_at,
            items,
            trends: &snapshot.trends,
            notifications: &snapshot.notifications,
        });
    }

    let generated = snapshot
        .generated_at
        .map(format_post_date)
        .unwrap_or_default();
    println!(
        "{} {} {}",
        "Feed".bold().cyan(),
        format!("for viewer {}", ctx.viewer()).dimmed(),
        generated.dimmed()
    );
    println!("{}", "─".repeat(HEADER_DIVIDER_WIDTH).dimmed());

    if items.is_empty() {
        println!("{}", "No posts to show.".yellow());
    }
    for (i, item) in items.iter().enumerate() {
        print_post(i + 1, item.relationship, item.post);
        if explain {
            print_explanation(&item.explanation);
        }
        println!();
    }

    print_trends(&snapshot.trends);
    print_notifications(&snapshot.notifications);
    Ok(())
}

fn pill(label: RelationshipLabel) -> colored::ColoredString {
    let text = format!("[{}]", label.pill());
    match label {
        RelationshipLabel::SelfAuthored => text.cyan(),
        RelationshipLabel::Following => text.green(),
        RelationshipLabel::NotFollowing => text.dimmed(),
    }
}

fn print_post(num: usize, label: RelationshipLabel, post: &Post) {
    println!(
        "{}. {} {} {} {}",
        num.to_string().dimmed(),
        pill(label),
        format!("@{}", post.author.handle).bold(),
        post.author.display_name,
        format!("· {} · {}", format_post_date(post.created_at), post.topic).dimmed()
    );

    if post.is_reply {
        if let Some(parent) = post.reply_to_id {
            println!("   {}", format!("↳ reply to #{parent}").dimmed());
        }
    }

    for line in textwrap::wrap(&post.content, 76) {
        println!("   {line}");
    }

    println!(
        "   {}",
        format!(
            "#{}  ♥ {}  ↩ {}  ⟳ {}  ❝ {}",
            post.id,
            format_number(post.like_count),
            format_number(post.reply_count),
            format_number(post.repost_count),
            format_number(post.quote_count)
        )
        .dimmed()
    );
}

fn print_explanation(view: &ExplanationView) {
    let rows = |rows: &[feedview::explain::DisplayRow]| {
        rows.iter()
            .map(|r| format!("{} {}", r.label, r.value))
            .collect::<Vec<_>>()
            .join(" · ")
    };

    println!("   {} {}", "Score".yellow(), view.score);
    if !view.signals.is_empty() {
        println!("   {} {}", "Signals:".dimmed(), rows(&view.signals));
    }
    if !view.actions.is_empty() {
        println!("   {} {}", "Actions:".dimmed(), rows(&view.actions));
    }
    println!("   {} {}", "Notes:".dimmed(), view.notes);
    println!("   {} {}", "Pipeline:".dimmed(), view.pipeline);
}

fn print_trends(trends: &[Trend]) {
    println!("{}", "Trends".bold().cyan());
    if trends.is_empty() {
        println!("  {}", "No trends yet.".dimmed());
    }
    for trend in trends {
        println!(
            "  {:>5}  #{}",
            format_trend_score(trend.score).yellow(),
            trend.topic
        );
    }
    println!();
}

fn print_notifications(notifications: &[Notification]) {
    println!("{}", "Notifications".bold().cyan());
    if notifications.is_empty() {
        println!("  {}", "Nothing new.".dimmed());
    }
    for n in notifications {
        let marker = if n.is_read { " " } else { "•" };
        println!(
            "  {} {} {}",
            marker.green(),
            n.title.bold(),
            format_relative_date(n.created_at).dimmed()
        );
        for line in textwrap::wrap(&n.body, 72) {
            println!("    {line}");
        }
    }
}

async fn cmd_trends(ctx: &App) -> Result<()> {
    let trends = ctx.backend()?.trends().await?;
    if ctx.is_text() {
        print_trends(&trends);
        Ok(())
    } else {
        ctx.print_json(&trends)
    }
}

async fn cmd_notifications(ctx: &App) -> Result<()> {
    let mut notifications = ctx.backend()?.notifications(ctx.viewer()).await?;
    notifications.truncate(ctx.config.feed.notification_limit);
    if ctx.is_text() {
        print_notifications(&notifications);
        Ok(())
    } else {
        ctx.print_json(&notifications)
    }
}

async fn cmd_like(ctx: &App, args: &LikeArgs) -> Result<()> {
    let session = FeedSession::new(ctx.backend()?, ctx.viewer())
        .with_notification_limit(ctx.config.feed.notification_limit)
        .with_default_preferences(ctx.config.preferences());

    let like = session.like_post(args.post).await?;
    let snapshot = session.snapshot();

    if !ctx.is_text() {
        #[derive(Serialize)]
        struct LikeOutput<'a> {
            like: &'a LikeResponse,
            items: Vec<RenderedItem<'a>>,
        }
        return ctx.print_json(&LikeOutput {
            like: &like,
            items: render_items(&snapshot),
        });
    }

    println!(
        "{} post #{} ({} likes, {})",
        "Liked".green().bold(),
        args.post,
        format_number(like.like_count),
        like.status
    );
    println!(
        "{}",
        format!("Feed refreshed: {} items", snapshot.items.len()).dimmed()
    );
    Ok(())
}

// =============================================================================
// Users, profiles and the graph
// =============================================================================

fn print_user_line(user: &User, label: Option<RelationshipLabel>) {
    let badge = label.map(|l| format!("{} ", pill(l))).unwrap_or_default();
    println!(
        "  {}{} {} {}",
        badge,
        format!("@{}", user.handle).bold(),
        user.display_name,
        format!("({})", user.persona_type).dimmed()
    );
    if !user.bio.is_empty() {
        println!("      {}", truncate(&user.bio, BIO_WIDTH).dimmed());
    }
}

async fn cmd_connections(ctx: &App, args: &UserArgs, followers: bool) -> Result<()> {
    let backend = ctx.backend()?;
    let subject = args.user.unwrap_or_else(|| ctx.viewer());
    let users = if followers {
        backend.followers(subject).await?
    } else {
        backend.following(subject).await?
    };

    if !ctx.is_text() {
        return ctx.print_json(&users);
    }

    let title = if followers { "Followers" } else { "Following" };
    println!(
        "{} {}",
        format!("{title} of user {subject}").bold().cyan(),
        format!("({})", users.len()).dimmed()
    );
    if users.is_empty() {
        println!("  {}", "Nobody yet.".dimmed());
    }
    for user in &users {
        print_user_line(user, None);
    }
    Ok(())
}

async fn cmd_profile(ctx: &App, args: &ProfileArgs) -> Result<()> {
    let mut view = ProfileView::new(ctx.backend()?, ctx.viewer(), args.user);
    let report = view.load().await;

    if !report.is_complete() && !ctx.quiet {
        eprintln!(
            "{}",
            "Some profile data could not be loaded; showing what is available.".yellow()
        );
    }

    let sets = view.connection_sets();
    let connections = sets.connection_list(args.view);

    if !ctx.is_text() {
        #[derive(Serialize)]
        struct ProfileOutput<'a> {
            user: Option<&'a User>,
            posts: Vec<LabeledPost<'a>>,
            following: &'a [User],
            followers: &'a [User],
            view: ConnectionView,
            connections: &'a [User],
        }
        #[derive(Serialize)]
        struct LabeledPost<'a> {
            relationship: RelationshipLabel,
            post: &'a Post,
        }
        return ctx.print_json(&ProfileOutput {
            user: view.user(),
            posts: view
                .labeled_posts()
                .into_iter()
                .map(|(relationship, post)| LabeledPost { relationship, post })
                .collect(),
            following: view.sidebar_following(),
            followers: view.sidebar_followers(),
            view: args.view,
            connections,
        });
    }

    let Some(user) = view.user() else {
        return Err(Reported(format_error(
            &format!("Could not load user {}", args.user),
            "",
            &["Check the user id and that the backend is running."],
        ))
        .into());
    };

    println!(
        "{} {} {}",
        user.display_name.bold().cyan(),
        format!("@{}", user.handle).bold(),
        format!("({})", user.persona_type).dimmed()
    );
    if !user.bio.is_empty() {
        for line in textwrap::wrap(&user.bio, 76) {
            println!("{line}");
        }
    }
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());

    println!("{}", "Posts".bold());
    if view.posts().is_empty() {
        println!("  {}", "No posts yet.".dimmed());
    }
    for (i, (label, post)) in view.labeled_posts().into_iter().enumerate() {
        print_post(i + 1, label, post);
    }
    println!();

    println!(
        "{} {}",
        "Following".bold(),
        format!("({})", view.data().following.len()).dimmed()
    );
    for u in view.sidebar_following() {
        print_user_line(u, None);
    }
    println!(
        "{} {}",
        "Followers".bold(),
        format!("({})", view.data().followers.len()).dimmed()
    );
    for u in view.sidebar_followers() {
        print_user_line(u, None);
    }
    println!();

    let heading = match args.view {
        ConnectionView::Following => "Following",
        ConnectionView::NotFollowing => "Not following",
    };
    println!("{}", heading.bold().cyan());
    if connections.is_empty() {
        println!("  {}", args.view.empty_message().dimmed());
    }
    for u in connections {
        print_user_line(u, Some(sets.label_for(u.id)));
    }
    Ok(())
}

async fn cmd_graph(ctx: &App) -> Result<()> {
    let graph = Arc::new(ctx.backend()?.graph().await?);
    let mut memo = MemoizedIndex::new();
    let index = memo.get(&graph);
    let rows = graph_rows(&graph, &index);

    if !ctx.is_text() {
        return ctx.print_json(&rows);
    }

    println!(
        "{} {}",
        "Follow graph".bold().cyan(),
        format!("({} users, {} follows)", index.len(), index.edge_count()).dimmed()
    );
    for row in &rows {
        let follows = if row.follows.is_empty() {
            "—".dimmed().to_string()
        } else {
            row.follows
                .iter()
                .map(|h| format!("@{h}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {} {} → {}",
            format!("@{}", row.node.handle).bold(),
            format!("({})", row.node.persona_type).dimmed(),
            follows
        );
    }
    Ok(())
}

async fn cmd_simulate(ctx: &App, args: &SimulateArgs) -> Result<()> {
    ctx.backend()?.advance_simulation(args.steps).await?;
    if ctx.is_text() {
        println!(
            "{} simulation by {} step(s)",
            "Advanced".green().bold(),
            args.steps
        );
        Ok(())
    } else {
        ctx.print_json(&serde_json::json!({ "steps": args.steps }))
    }
}

// =============================================================================
// Config and completions
// =============================================================================

fn cmd_config(ctx: &App, args: &ConfigArgs) -> Result<()> {
    let path = Config::user_config_path();

    if args.init {
        let Some(path) = &path else {
            anyhow::bail!("Could not determine config directory");
        };
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            Config::default().save_to(path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
    }

    if let Some(assignment) = &args.set {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{assignment}'"))?;
        let key = key.trim();
        if !VALID_CONFIG_KEYS.contains(&key) {
            return Err(Reported(format_unknown_value_error(
                "config key",
                key,
                VALID_CONFIG_KEYS,
            ))
            .into());
        }

        let mut file_config = path
            .as_deref()
            .and_then(Config::load_from_file)
            .unwrap_or_default();
        file_config.set_value(key, value)?;
        let saved = file_config.save()?;
        println!("{} {key} in {}", "Set".green(), saved.display());
    }

    if args.show || (!args.init && args.set.is_none()) {
        if !ctx.is_text() {
            return ctx.print_json(&ctx.config);
        }
        println!("{}", "Current Configuration".bold().cyan());
        if let Some(path) = &path {
            println!("{}", format!("# {}", path.display()).dimmed());
        }
        print!("{}", toml::to_string_pretty(&ctx.config)?);
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn cmd_completions(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "feedview", &mut io::stdout());
    Ok(())
}
