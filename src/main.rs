use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytmeta::config::Config;
use ytmeta::models::SortOrder;

mod commands;

#[derive(Parser)]
#[command(
    name = "ytmeta",
    version,
    about = "Comment extraction for a video-sharing platform, printed as JSON lines",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the comments of a video
    Comments {
        /// Video id or URL
        video: String,

        /// Sort order (top, recent)
        #[arg(short, long, default_value = "top")]
        sort: SortOrder,

        /// Maximum number of comments
        #[arg(short, long)]
        limit: Option<usize>,

        /// Stop at comments older than this date (YYYY-MM-DD, requires --sort recent)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Keep reply continuation tokens on each comment
        #[arg(long, default_value = "false")]
        with_reply_tokens: bool,

        /// Print one JSON document of threads instead of JSON lines
        #[arg(long, default_value = "false")]
        threads: bool,
    },

    /// Fetch the replies behind a reply continuation token
    Replies {
        /// Reply continuation token
        token: String,

        /// Parent comment id to attach the replies to
        #[arg(short, long)]
        parent: Option<String>,

        /// Maximum number of replies
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env().context("Invalid environment configuration")?,
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Comments {
            video,
            sort,
            limit,
            since,
            with_reply_tokens,
            threads,
        } => {
            tracing::info!(
                video = %video,
                sort = %sort,
                limit = ?limit,
                since = ?since,
                with_reply_tokens = %with_reply_tokens,
                "Starting comments command"
            );
            let options = commands::CommentOptions {
                sort,
                limit,
                since,
                with_reply_tokens,
                threads,
            };
            commands::comments(&config, &video, options).await?;
        }

        Commands::Replies {
            token,
            parent,
            limit,
        } => {
            tracing::info!(parent = ?parent, limit = ?limit, "Starting replies command");
            commands::replies(&config, &token, parent, limit).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ytmeta=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("ytmeta={level},warn"))
            .context("Invalid log level")?
    };

    // Logs go to stderr; stdout carries the records
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
