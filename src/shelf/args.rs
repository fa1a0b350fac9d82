use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// "0.3.2" outside a git checkout, "0.3.2@abc1234 2024-01-15" inside one.
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("SHELF_GIT_HASH");
    const GIT_DATE: &str = env!("SHELF_GIT_DATE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "shelf", bin_name = "shelf", version = version())]
#[command(about = "Query and edit directories of Markdown, JSON and YAML records")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Collection format (markdown, json, yaml); inferred from the files when omitted
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Field that holds a Markdown file's body (default: content)
    #[arg(long, global = true)]
    pub body_field: Option<String>,

    /// Include files in sub-directories
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// JSON file with collection options; flags override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List records
    #[command(alias = "ls")]
    List {
        /// Collection directory
        dir: PathBuf,

        /// Filter: field=value, field!=value or field~value (repeatable)
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        /// Sort field; prefix with '-' for descending
        #[arg(short, long, allow_hyphen_values = true)]
        order_by: Option<String>,

        /// Keep only the first N records
        #[arg(long, allow_negative_numbers = true)]
        head: Option<i64>,

        /// Keep only the last N records
        #[arg(long, allow_negative_numbers = true)]
        tail: Option<i64>,

        /// Comma-separated fields to print after the path
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Count records
    Count {
        /// Collection directory
        dir: PathBuf,

        /// Filter: field=value, field!=value or field~value (repeatable)
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,
    },

    /// Print one record as JSON
    Show {
        /// Collection directory
        dir: PathBuf,

        /// File name, relative to the directory
        file: PathBuf,
    },

    /// Add a record and print the path it was written to
    Add {
        /// Collection directory (an empty one defaults to markdown)
        dir: PathBuf,

        /// Field assignment: field=value (repeatable)
        #[arg(short, long = "set", required = true)]
        set: Vec<String>,

        /// Explicit file name instead of one derived from the record
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Delete a record file
    #[command(alias = "rm")]
    Delete {
        /// Collection directory
        dir: PathBuf,

        /// File name, relative to the directory
        file: PathBuf,
    },

    /// List supported formats and their extensions
    Formats,
}
