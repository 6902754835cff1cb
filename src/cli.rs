//! CLI argument parsing and configuration overrides.
use clap::Parser;
use std::path::PathBuf;

use crate::{config::Config, formatter::LinkStyle, mapper::Strategy};

/// Find the bugs fixed between two git references and print the
/// changelog and packaging commands for the new release.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Previous release reference (tag, branch or commit).
    pub old: String,

    /// New release reference (tag, branch or commit).
    pub new: String,

    #[arg(long, value_enum, default_value_t = Strategy::Search)]
    /// How commits are mapped to pull requests.
    pub strategy: Strategy,

    #[arg(long = "remote")]
    /// Remote to read the project from. Repeat to try several in order.
    pub remotes: Vec<String>,

    #[arg(long, default_value = ".")]
    /// Path to the local git clone.
    pub repo_path: PathBuf,

    #[arg(long)]
    /// Configuration file. Defaults to find-bzs.toml in the repo path.
    pub config: Option<PathBuf>,

    #[arg(long)]
    /// Directory for cached search responses.
    pub cache_dir: Option<PathBuf>,

    #[arg(long)]
    /// GitHub token file. Falls back to GITHUB_TOKEN env var.
    pub github_token_file: Option<PathBuf>,

    #[arg(long)]
    /// Bugzilla API key file. Falls back to BUGZILLA_API_KEY env var.
    pub bugzilla_key_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    /// Keep bugs that are already CLOSED.
    pub include_closed: bool,

    #[arg(long, value_enum)]
    /// One bug list link, or one link per bug.
    pub link_style: Option<LinkStyle>,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Apply command line flags on top of file configuration.
    pub fn apply(&self, config: &mut Config) {
        if !self.remotes.is_empty() {
            config.forge.remotes = self.remotes.clone();
        }

        if self.include_closed {
            config.tracker.include_closed = true;
        }

        if let Some(style) = self.link_style {
            config.tracker.link_style = style;
        }

        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
    }
}
