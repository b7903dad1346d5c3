use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_LIST_LIMIT;

/// What to do with the summary once it is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Print and write the summary
    Report,
    /// Also submit the summary as a post
    Post,
}

/// Community health bot CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "community-health-bot",
    version,
    about = "Weekly health summaries for Reddit communities"
)]
pub struct Cli {
    /// Communities to summarize (e.g. r/rust r/golang)
    #[arg(long, num_args = 1.., required = true)]
    pub subreddits: Vec<String>,

    /// report: print/write summary; post: also submit it
    #[arg(long, value_enum, default_value_t = Mode::Report)]
    pub mode: Mode,

    /// Community to post the summary to (required in post mode)
    #[arg(long, required_if_eq("mode", "post"))]
    pub post_to: Option<String>,

    /// Top posts per community unless the config file overrides it
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// TOML file with per-community settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use generated posts instead of the Reddit API
    #[arg(long)]
    pub mock: bool,

    /// Serve the read-only dashboard API on this address after the run
    #[arg(long)]
    pub serve: Option<SocketAddr>,
}
