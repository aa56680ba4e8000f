//! # NewsRadar CLI (`radar`)
//!
//! Browse topic groups, manage topics, and read the content feed of a
//! NewsRadar server from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! radar --config ./config/radar.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `radar whoami` | Show the signed-in user |
//! | `radar login <email>` | Email a sign-in link |
//! | `radar logout` | End the session |
//! | `radar groups` | List topic groups |
//! | `radar group create\|edit\|delete` | Manage topic groups |
//! | `radar topics` | List topics of a group, optionally searched |
//! | `radar topic create\|edit\|delete` | Manage topics |
//! | `radar topic run <id>` | Run a web search for a topic now |
//! | `radar topic sources <id>` | Show where a topic's content came from |
//! | `radar executions` | List search runs |
//! | `radar feed` | Show the content feed for a selection |
//! | `radar bookmark <id>` | Toggle a bookmark |
//! | `radar bookmarks` | List bookmarked content |
//!
//! Set `RUST_LOG=debug` (or pass `--verbose`) to trace requests and
//! selection changes on stderr.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use newsradar_client::config;
use newsradar_client::{auth_cmd, feed_cmd, group_cmd, logging, topic_cmd};
use newsradar_core::models::{
    ExecutionStatus, GroupPatch, Initiator, Recency, TopicFilters, TopicPatch, Visibility,
};

/// NewsRadar CLI: topic groups, topics, and the content feed.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/radar.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "radar",
    about = "NewsRadar: browse topic groups, manage topics, and read the content feed",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/radar.toml")]
    config: PathBuf,

    /// Print JSON instead of text on listing commands.
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in user.
    Whoami,

    /// Request a magic sign-in link by email.
    Login {
        /// Address to send the link to.
        email: String,
    },

    /// Sign out of the current session.
    Logout,

    /// List topic groups visible to the current session.
    ///
    /// The group marked `*` is the one selected by default.
    Groups,

    /// Create, edit, or delete a topic group.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// List topics of a group (default: the selected group).
    Topics {
        /// Group id or name.
        #[arg(long)]
        group: Option<String>,

        /// Only topics with this exact query (whitespace is collapsed).
        #[arg(long)]
        search: Option<String>,
    },

    /// Create, edit, or delete a topic.
    Topic {
        #[command(subcommand)]
        action: TopicAction,
    },

    /// Show the content feed for a group or topic.
    Feed {
        /// Group id or name.
        #[arg(long)]
        group: Option<String>,

        /// Topic id.
        #[arg(long)]
        topic: Option<String>,

        /// Number of pages to load (page size comes from `feed.page_size`).
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Toggle the bookmark on a content item.
    Bookmark {
        /// Content item id.
        content_id: i64,

        /// Group id or name the item is listed under.
        #[arg(long)]
        group: Option<String>,

        /// Topic id the item is listed under.
        #[arg(long)]
        topic: Option<String>,
    },

    /// List bookmarked content, newest first.
    Bookmarks,

    /// List search runs, newest first.
    Executions {
        /// running, completed, or failed.
        #[arg(long)]
        status: Option<ExecutionStatus>,

        /// periodic, user, admin, or cli.
        #[arg(long)]
        initiator: Option<Initiator>,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Create a topic group.
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Make the group browsable without signing in.
        #[arg(long)]
        public: bool,
    },

    /// Edit a topic group.
    Edit {
        /// Group id or name.
        group: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, conflicts_with = "private")]
        public: bool,

        #[arg(long)]
        private: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Delete a topic group. Its topics are kept, ungrouped.
    Delete {
        /// Group id or name.
        group: String,
    },
}

#[derive(Subcommand)]
enum TopicAction {
    /// Create a topic. The first query is its display term.
    Create {
        #[arg(required = true)]
        queries: Vec<String>,

        /// Group id or name.
        #[arg(long)]
        group: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Edit a topic.
    Edit {
        id: String,

        #[arg(long, conflicts_with = "inactive")]
        active: bool,

        #[arg(long)]
        inactive: bool,

        /// Replace the topic's queries.
        #[arg(long = "query")]
        queries: Vec<String>,
    },

    /// Delete a topic.
    Delete { id: String },

    /// Run a web search for a topic now.
    Run { id: String },

    /// Show the sources of a topic's content.
    Sources { id: String },
}

/// Search filter flags shared by topics and group defaults.
#[derive(Args)]
struct FilterArgs {
    /// Only search these domains.
    #[arg(long = "allow")]
    allow: Vec<String>,

    /// Never search these domains.
    #[arg(long = "block")]
    block: Vec<String>,

    /// Restrict results to these languages.
    #[arg(long = "language")]
    languages: Vec<String>,

    #[arg(long)]
    country: Option<String>,

    /// Recency window: day, week, month, or year.
    #[arg(long)]
    recency: Option<Recency>,
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        self.allow.is_empty()
            && self.block.is_empty()
            && self.languages.is_empty()
            && self.country.is_none()
            && self.recency.is_none()
    }

    fn into_filters(self) -> TopicFilters {
        TopicFilters {
            domain_allowlist: self.allow,
            domain_blocklist: self.block,
            languages: self.languages,
            country: self.country,
            recency: self.recency,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Whoami => auth_cmd::run_whoami(&cfg, cli.json).await?,
        Commands::Login { email } => auth_cmd::run_login(&cfg, &email).await?,
        Commands::Logout => auth_cmd::run_logout(&cfg).await?,
        Commands::Groups => group_cmd::run_list(&cfg, cli.json).await?,
        Commands::Group { action } => match action {
            GroupAction::Create {
                name,
                description,
                public,
            } => group_cmd::run_create(&cfg, &name, description, public).await?,
            GroupAction::Edit {
                group,
                name,
                description,
                public,
                private,
                filters,
            } => {
                let visibility = match (public, private) {
                    (true, _) => Some(Visibility::Public),
                    (_, true) => Some(Visibility::Private),
                    _ => None,
                };
                let patch = GroupPatch {
                    name,
                    description,
                    visibility,
                    default_filters: (!filters.is_empty()).then(|| filters.into_filters()),
                };
                group_cmd::run_edit(&cfg, &group, patch).await?
            }
            GroupAction::Delete { group } => group_cmd::run_delete(&cfg, &group).await?,
        },
        Commands::Topics { group, search } => {
            topic_cmd::run_list(&cfg, group.as_deref(), search.as_deref(), cli.json).await?
        }
        Commands::Topic { action } => match action {
            TopicAction::Create {
                queries,
                group,
                filters,
            } => {
                topic_cmd::run_create(&cfg, queries, group.as_deref(), filters.into_filters())
                    .await?
            }
            TopicAction::Edit {
                id,
                active,
                inactive,
                queries,
            } => {
                let patch = TopicPatch {
                    is_active: match (active, inactive) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                    queries: (!queries.is_empty()).then_some(queries),
                    filters: None,
                };
                topic_cmd::run_edit(&cfg, &id, patch).await?
            }
            TopicAction::Delete { id } => topic_cmd::run_delete(&cfg, &id).await?,
            TopicAction::Run { id } => topic_cmd::run_search(&cfg, &id, cli.json).await?,
            TopicAction::Sources { id } => topic_cmd::run_sources(&cfg, &id, cli.json).await?,
        },
        Commands::Feed {
            group,
            topic,
            pages,
        } => {
            feed_cmd::run_feed(&cfg, group.as_deref(), topic.as_deref(), pages, cli.json).await?
        }
        Commands::Bookmark {
            content_id,
            group,
            topic,
        } => feed_cmd::run_bookmark(&cfg, content_id, group.as_deref(), topic.as_deref()).await?,
        Commands::Bookmarks => feed_cmd::run_bookmarks(&cfg, cli.json).await?,
        Commands::Executions { status, initiator } => {
            topic_cmd::run_executions(&cfg, status, initiator, cli.json).await?
        }
    }

    Ok(())
}
