use std::path::PathBuf;

use clap::{Parser, Subcommand};

use chronicle_core::ViewMode;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
#[command(
    name = "chronicle",
    version,
    about = "Timeline blog tools: eras, friend feeds, publishing and site output"
)]
pub struct Cli {
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show which era a year belongs to
    Era { year: i64 },
    /// List timeline events, grouped by era
    Timeline {
        #[arg(long)]
        era: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        from: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        to: Option<i64>,
        #[arg(long)]
        key_only: bool,
        /// Include events from friend sites
        #[arg(long)]
        with_friends: bool,
        /// Print totals and span instead of the events
        #[arg(long)]
        stats: bool,
    },
    /// Manage friend sites
    Friends {
        #[command(subcommand)]
        action: FriendsCommand,
    },
    /// List local posts, optionally merged with friend posts
    Posts {
        #[arg(long)]
        with_friends: bool,
        #[arg(long)]
        drafts: bool,
    },
    /// Write a new draft post with generated frontmatter
    NewPost {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Comma separated
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        timeline_year: Option<i64>,
        /// Output directory; defaults to the posts directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Convert a .txt, .html or .md file into a draft post
    Import {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Commit a local post to the repository
    Publish {
        file: PathBuf,
        #[arg(long)]
        draft: bool,
        #[arg(long)]
        subfolder: Option<String>,
    },
    /// Delete a post from the repository
    Delete {
        path: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// List posts stored in the repository
    RemotePosts {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Dispatch the deploy workflow
    Rebuild,
    /// Store a personal access token
    Login { token: String },
    /// Forget the stored token
    Logout,
    /// Write the RSS feed
    Rss {
        #[arg(long, default_value = "dist/rss.xml")]
        out: PathBuf,
    },
    /// Write friend-content.json for other sites to read
    FriendJson {
        #[arg(long, default_value = "dist/friend-content.json")]
        out: PathBuf,
    },
    /// Drive the timeline view and persist its preferences
    View {
        #[command(subcommand)]
        action: ViewCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum FriendsCommand {
    /// Validate a site and add it as a friend
    Add { url: String },
    /// Remove a friend by id or url
    Remove { friend: String },
    List,
    /// Refresh posts for one friend, or all of them
    Sync { friend: Option<String> },
    /// Turn friend content in listings on or off
    Toggle {
        #[arg(value_parser = clap::value_parser!(bool))]
        enabled: Option<bool>,
    },
    /// Write a friend's markdown page
    Export {
        friend: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommand {
    /// Print the current view state
    Show {
        #[arg(long, default_value_t = 1200.0)]
        viewport: f64,
    },
    Mode { mode: ViewMode },
    Compact,
    ZoomIn,
    ZoomOut,
    Pan {
        #[arg(allow_hyphen_values = true)]
        dx: f64,
        #[arg(allow_hyphen_values = true, default_value_t = 0.0)]
        dy: f64,
    },
    /// Zoom back to 1 and re-center
    Reset,
    /// Focus an era, or clear the focus when omitted
    Era { key: Option<String> },
}
