//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lookalike",
    version,
    about = "Dual-index semantic product search",
    long_about = "Lookalike indexes catalog products under both a visual (CLIP) and a textual \
                  embedding, then answers similarity queries from an uploaded photo, a typed \
                  description, or a weighted combination of both."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/lookalike/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a product: encodes its image and text, then snapshots
    Add {
        /// External product identifier (may repeat across images)
        #[arg(long)]
        id: String,

        /// Path to the product image
        #[arg(long)]
        image: PathBuf,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Search the catalog by text, image, or both
    Search {
        /// Text query
        #[arg(short, long)]
        text: Option<String>,

        /// Image query (path to a photo)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Weight of the text score in hybrid search, in [0, 1]
        #[arg(short = 'w', long)]
        text_weight: Option<f32>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index counters
    Stats {
        /// Show stats in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
