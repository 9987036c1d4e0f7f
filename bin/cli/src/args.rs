use std::path::PathBuf;

use clap::Parser;
use scm::platforms::ScmPlatforms;

/// Adds releases missing from a changelog, attributing closed issues and merged changes to the
/// release that first shipped them.
#[derive(Debug, Default, Parser)]
#[command(name = "chlog", version)]
pub(crate) struct Opt {
    #[arg(
        long,
        help = "Prints a verbose output during the program execution",
        global = true
    )]
    pub debug: bool,

    /// Configuration file. Defaults to .chlog.toml when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hosting platform of the repository
    #[arg(long)]
    pub platform: Option<ScmPlatforms>,

    /// Owner of the repository, a group path on GitLab
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// API token. Falls back to GITHUB_TOKEN or GITLAB_TOKEN.
    #[arg(long)]
    pub token: Option<String>,

    /// Release branch. Defaults to the repository's default branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Oldest tag to generate
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<String>,

    /// Newest tag to generate
    #[arg(long, allow_hyphen_values = true)]
    pub to: Option<String>,

    /// Lists unreleased changes under this upcoming release
    #[arg(long, allow_hyphen_values = true)]
    pub future: Option<String>,

    /// Tag to ignore. May be repeated.
    #[arg(long = "exclude-tag", value_name = "TAG")]
    pub exclude_tags: Vec<String>,

    /// Ignores tags matching this regex
    #[arg(long, value_name = "PATTERN")]
    pub exclude_tags_regex: Option<String>,

    /// Changelog file to update
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Prints the updated changelog instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}
