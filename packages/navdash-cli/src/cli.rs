//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use navdash_core::types::{GroupId, SiteId};

/// Navdash - manage a grouped bookmark dashboard from the terminal
#[derive(Parser, Debug)]
#[command(name = "navdash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Client config file (defaults to <config dir>/navdash/client.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the config file
    #[arg(long, global = true, env = "NAVDASH_API")]
    pub api: Option<String>,

    /// Bearer token, overrides the config file
    #[arg(long, global = true, env = "NAVDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show groups and their sites in display order
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write a backup document
    ///
    /// Without a path the file is named navdash-backup_YYYY-MM-DD.json in
    /// the current directory.
    Export {
        /// Destination file
        output: Option<PathBuf>,
    },

    /// Merge a backup document into the dashboard
    ///
    /// Groups are matched by name, sites by url within their group.
    /// Nothing is deleted.
    Import {
        /// Backup document to read
        file: PathBuf,

        /// Print the import result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a group at the end of the dashboard
    AddGroup {
        name: String,
    },

    /// Rename a group
    RenameGroup {
        id: GroupId,
        name: String,
    },

    /// Delete a group and all of its sites
    DeleteGroup {
        id: GroupId,
    },

    /// Create a site at the end of a group
    AddSite {
        /// Group to add the site to
        #[arg(short, long)]
        group: GroupId,

        name: String,

        url: String,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Derive the icon from the url using the configured icon service
        #[arg(long, conflicts_with = "icon")]
        auto_icon: bool,
    },

    /// Change fields of a site; omitted fields keep their value
    EditSite {
        id: SiteId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a site
    DeleteSite {
        id: SiteId,
    },

    /// Move a group into the position currently held by another group
    MoveGroup {
        id: GroupId,
        over: GroupId,
    },

    /// Move a site into the position currently held by another site of the same group
    MoveSite {
        id: SiteId,
        over: SiteId,
    },

    /// Read or write dashboard settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print one setting, or every setting when no key is given
    Get {
        key: Option<String>,
    },

    /// Write a setting
    Set {
        key: String,
        value: String,
    },
}
