pub mod onboard;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "updateme",
    about = "Personal work log & status report generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    /// Log a work entry; the category is inferred from the content unless given.
    Add {
        content: String,
        #[arg(long)]
        category: Option<String>,
        /// Entry date (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// Entry time (HH:MM), defaults to now.
        #[arg(long)]
        time: Option<String>,
    },
    List {
        #[command(flatten)]
        range: RangeArgs,
    },
    Edit {
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
    },
    Delete {
        id: String,
    },
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Generate a status report by merging entries into a template.
    Generate {
        /// Template id or name from the template store.
        #[arg(long)]
        template: Option<String>,
        /// Read the template from a file instead of the store.
        #[arg(long, conflicts_with = "template")]
        template_file: Option<PathBuf>,
        #[command(flatten)]
        range: RangeArgs,
        /// Write the report to a file instead of stdout; bare file names
        /// land in the configured export directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit clipboard-ready plain text instead of markup.
        #[arg(long, default_value_t = false)]
        text: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    Service,
}

/// Date range selection shared by `list` and `generate`.
#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Range start (YYYY-MM-DD), paired with --to.
    #[arg(long)]
    pub from: Option<String>,
    /// Range end (YYYY-MM-DD), paired with --from.
    #[arg(long)]
    pub to: Option<String>,
    /// Current week, Sunday through Saturday.
    #[arg(long, default_value_t = false, conflicts_with_all = ["from", "to"])]
    pub week: bool,
    /// The last fourteen days.
    #[arg(long, default_value_t = false, conflicts_with_all = ["from", "to", "week"])]
    pub fortnight: bool,
    /// The current fiscal quarter.
    #[arg(long, default_value_t = false, conflicts_with_all = ["from", "to", "week", "fortnight"])]
    pub quarter: bool,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommands {
    Add {
        name: String,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read template content from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    List,
    Show {
        id_or_name: String,
    },
    Edit {
        id_or_name: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Delete {
        id_or_name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
