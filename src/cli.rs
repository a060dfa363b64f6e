use clap::{ArgGroup, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "notes", author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the task API (overrides NOTES_API_URL)
    #[arg(long = "api-url", global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch TUI interface
    Tui,
    /// List notes, favorites first
    #[command(group(ArgGroup::new("fav").args(["favorite", "not_favorite"])))]
    List {
        /// Only notes with this status (pending, in_progress, completed)
        #[arg(long)]
        status: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorite: bool,
        /// Only notes that are not favorites
        #[arg(long = "not-favorite")]
        not_favorite: bool,
        /// Substring to search for
        #[arg(long)]
        search: Option<String>,
        /// Only notes with this color
        #[arg(long)]
        color: Option<String>,
    },
    /// Show one note
    Get {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Create a note
    Add {
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(short = 'd', long = "description")]
        description: Option<String>,
        #[arg(short = 'c', long = "color")]
        color: Option<String>,
    },
    /// Change fields of a note
    Update {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Set or clear the favorite flag
        #[arg(long, value_name = "BOOL")]
        favorite: Option<bool>,
    },
    /// Toggle a note between completed and pending
    Done {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Toggle the favorite flag of a note
    Favorite {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Delete a note
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum, value_name = "SHELL")]
        shell: Shell,
    },
}
