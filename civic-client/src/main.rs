use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use civic::api::{ApiClient, SocialApi};
use civic::app::{
    Direction, HomePage, Outcome, PageStatus, PollCarousel, PollHistory, PostController, PostSource,
    ProfileController, ProfileLoad, ProfilePage, ResultsSlot, ResultsView, SearchController,
};
use civic::config::{ConfigManager, Timings};
use civic::logging::{self, LogConfig};
use civic::session::SessionStore;
use civic::ui;
use civic_types::{PoliticalAlignment, PollAnswer};
use uuid::Uuid;

/// Civic - post, vote and find people from the command line
#[derive(Parser)]
#[command(name = "civic")]
#[command(about = "Command-line client for the Civic social platform")]
#[command(version)]
struct Cli {
    /// Server URL to connect to
    #[arg(long, short, env = "CIVIC_SERVER_URL", global = true)]
    server: Option<String>,

    /// Bearer token (overrides the stored session)
    #[arg(long, env = "CIVIC_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the global feed and the first poll
    Feed,
    /// Show posts by one user (yourself by default)
    Mine {
        #[arg(long)]
        user: Option<String>,
    },
    /// Publish a post
    Post { content: String },
    /// Replace the text of one of your posts
    Edit { post_id: Uuid, content: String },
    /// Delete one of your posts
    Delete {
        post_id: Uuid,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Walk through every poll
    Polls,
    /// Vote on a poll
    Vote {
        poll_id: String,
        /// yes or no
        answer: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show results of a poll you have voted on
    Results { poll_id: String },
    /// List poll votes (yours by default)
    Votes {
        #[arg(long)]
        user: Option<String>,
    },
    /// Find profiles by display name
    Search { query: String },
    /// Show a profile with its posts and votes
    Profile {
        #[arg(long)]
        user: Option<String>,
    },
    /// Change your display name, bio or political alignment
    UpdateProfile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// National, Labour, Independent, or empty to clear
        #[arg(long)]
        alignment: Option<String>,
    },
    /// Store a bearer token (and --server, if given) for later commands
    Login { token: String },
    /// Forget the stored token
    Logout,
}

/// Everything a command needs once the user is known
struct CommandEnv {
    api: Arc<dyn SocialApi>,
    viewer_id: String,
    timings: Timings,
    log_config: LogConfig,
}

// Load environment variables from .env file
// This allows CIVIC_SERVER_URL and CIVIC_TOKEN to be set without command-line args
fn load_env() {
    let _ = dotenv::dotenv();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    logging::init_logging(&log_config)?;

    let session = SessionStore::new()?;
    match &cli.command {
        Command::Login { token } => {
            session.save(token)?;
            println!("Token saved to {}", session.path().display());
            // Remember the server the token belongs to
            if let Some(server) = &cli.server {
                ConfigManager::new()?.save_server_url(server.clone())?;
                println!("Server set to {}", server);
            }
            return Ok(());
        }
        Command::Logout => {
            session.delete()?;
            println!("Logged out");
            return Ok(());
        }
        _ => {}
    }

    let config_manager = ConfigManager::new()?;
    let server_url = config_manager.determine_server_url(cli.server.clone())?;
    let timings = config_manager.timings()?;
    log::info!("Using server {}", server_url);

    let token = session
        .resolve(cli.token.clone())?
        .context("Not logged in. Run `civic login <token>` or set CIVIC_TOKEN")?;
    let mut client = ApiClient::new(server_url);
    client.set_bearer_token(Some(token));
    let api: Arc<dyn SocialApi> = Arc::new(client);

    // Ownership checks compare against the signed-in user's id
    let viewer_id = match api.get_profile(None).await {
        Ok(Some(profile)) => profile.user_id,
        Ok(None) => String::new(),
        Err(e) => bail!("Could not reach the server: {}", e.message()),
    };

    let ctx = CommandEnv {
        api,
        viewer_id,
        timings,
        log_config,
    };
    run(ctx, cli.command).await
}

async fn run(ctx: CommandEnv, command: Command) -> Result<()> {
    match command {
        Command::Feed => {
            let page = HomePage::new(ctx.api.clone(), ctx.viewer_id.clone(), ctx.timings.clone(), ctx.log_config.clone());
            if page.load().await == PageStatus::Onboarding {
                println!("No profile yet. Finish onboarding to set one up.");
                return Ok(());
            }
            print!("{}", ui::render_post_list(&page.feed.view(), page.feed.notice().as_ref()));
            print!("{}", ui::render_polls(&page.polls.view(), page.polls.notice().as_ref()));
        }
        Command::Mine { user } => {
            let posts = post_controller(&ctx, PostSource::User(user));
            posts.load().await;
            print!("{}", ui::render_post_list(&posts.view(), posts.notice().as_ref()));
        }
        Command::Post { content } => {
            let feed = post_controller(&ctx, PostSource::Feed);
            feed.load().await;
            feed.set_draft(content);
            let outcome = feed.submit_draft().await;
            print!("{}", ui::render_post_list(&feed.view(), feed.notice().as_ref()));
            if outcome == Outcome::Invalid {
                print!("{}", ui::render_composer(&feed.composer()));
            }
            fail_unless_applied(outcome)?;
        }
        Command::Edit { post_id, content } => {
            let posts = post_controller(&ctx, PostSource::User(None));
            posts.load().await;
            if posts.edit(post_id) == Outcome::Skipped {
                bail!("Post {} is not one of yours", post_id);
            }
            let outcome = posts.save_edit(post_id, &content).await;
            print!("{}", ui::render_post_list(&posts.view(), posts.notice().as_ref()));
            fail_unless_applied(outcome)?;
        }
        Command::Delete { post_id, yes } => {
            let posts = post_controller(&ctx, PostSource::User(None));
            posts.load().await;
            if !posts.with_state(|s| s.contains(post_id)) {
                bail!("Post {} is not one of yours", post_id);
            }
            let outcome = posts.delete(post_id, |prompt| yes || confirm(prompt)).await;
            match outcome {
                Outcome::Applied => println!("Deleted."),
                Outcome::Skipped => println!("Cancelled."),
                _ => {}
            }
            print!("{}", ui::render_post_list(&posts.view(), posts.notice().as_ref()));
            if outcome == Outcome::Failed {
                bail!("Post not deleted");
            }
        }
        Command::Polls => {
            let polls = poll_carousel(&ctx);
            polls.load().await;
            print!("{}", ui::render_polls(&polls.view(), polls.notice().as_ref()));
            while polls.navigate(Direction::Next).await == Outcome::Applied {
                println!();
                print!("{}", ui::render_polls(&polls.view(), None));
            }
        }
        Command::Vote { poll_id, answer, reason } => {
            let answer = PollAnswer::parse(&answer).context("Answer must be yes or no")?;
            let polls = poll_carousel(&ctx);
            polls.load().await;
            let outcome = polls.vote(&poll_id, Some(answer), reason.as_deref()).await;
            if outcome == Outcome::Skipped {
                bail!("Poll {} is not open for your vote", poll_id);
            }
            if let Some(notice) = polls.notice() {
                println!("{}", notice.message());
            }
            print_results(polls.results(&poll_id));
            fail_unless_applied(outcome)?;
        }
        Command::Results { poll_id } => {
            let polls = poll_carousel(&ctx);
            polls.load().await;
            polls.fetch_results(&poll_id).await;
            if polls.results(&poll_id).is_none() {
                bail!("Vote on poll {} to see its results", poll_id);
            }
            print_results(polls.results(&poll_id));
        }
        Command::Votes { user } => {
            let history = PollHistory::new(ctx.api.clone(), user).with_log_config(ctx.log_config.clone());
            if history.load().await == Outcome::Failed {
                bail!(history.error().unwrap_or_default());
            }
            print!("{}", ui::render_history(&history.votes()));
        }
        Command::Search { query } => {
            let search = SearchController::new(ctx.api.clone(), ctx.timings.clone()).with_log_config(ctx.log_config.clone());
            search.input(query);
            search.submit().await;
            print!("{}", ui::render_search(&search.view()));
        }
        Command::Profile { user } => {
            let page = ProfilePage::new(ctx.api.clone(), ctx.viewer_id.clone(), user, ctx.timings.clone(), ctx.log_config.clone());
            let status = page.load().await;
            print!("{}", ui::render_profile(&page.profile.view()));
            if let PageStatus::Failed(msg) = status {
                bail!(msg);
            }
            if status == PageStatus::Ready {
                println!("\nPosts");
                print!("{}", ui::render_post_list(&page.posts.view(), None));
                println!("Poll votes");
                print!("{}", ui::render_history(&page.votes.votes()));
            }
        }
        Command::UpdateProfile {
            display_name,
            bio,
            alignment,
        } => {
            let profile = ProfileController::new(ctx.api.clone(), ctx.viewer_id.clone(), None, ctx.timings.clone())
                .with_log_config(ctx.log_config.clone());
            match profile.load().await {
                ProfileLoad::Ready(_) => {}
                ProfileLoad::Onboarding => bail!("No profile yet. Finish onboarding to set one up."),
                ProfileLoad::Failed(msg) => bail!(msg),
            }
            profile.enter_edit();

            let mut form = profile.form();
            if let Some(name) = display_name {
                form.display_name = name;
            }
            if let Some(bio) = bio {
                form.bio = bio;
            }
            if let Some(alignment) = alignment {
                form.political_alignment = PoliticalAlignment::parse(&alignment)
                    .context("Alignment must be National, Labour, Independent, or empty")?;
            }
            profile.set_form(form);

            let outcome = profile.submit_form().await;
            if let Some(notice) = profile.notice() {
                println!("{}", notice.message());
            }
            if outcome == Outcome::Invalid || outcome == Outcome::Failed {
                bail!("Profile not updated");
            }
        }
        Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

fn post_controller(ctx: &CommandEnv, source: PostSource) -> PostController {
    PostController::new(ctx.api.clone(), source, ctx.viewer_id.clone(), ctx.timings.clone())
        .with_log_config(ctx.log_config.clone())
}

fn poll_carousel(ctx: &CommandEnv) -> PollCarousel {
    PollCarousel::new(ctx.api.clone(), ctx.timings.clone()).with_log_config(ctx.log_config.clone())
}

fn fail_unless_applied(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Applied => Ok(()),
        other => bail!("Request not completed ({:?})", other),
    }
}

fn print_results(slot: Option<ResultsSlot>) {
    match slot {
        Some(ResultsSlot::Ready(results)) => {
            let view = ResultsView::from(&results);
            println!("Yes {:>6}", view.yes);
            println!("No  {:>6}", view.no);
            println!("{}", view.total);
        }
        Some(ResultsSlot::Failed(msg)) => println!("Failed to load results: {}", msg),
        Some(ResultsSlot::Loading) | None => {}
    }
}

/// Ask a yes/no question on stdin; anything but "y"/"yes" is a no
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
