//! CLI command definitions and parsing
use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "burrow",
    version,
    author = "neur0map",
    about = "Semantic tagging and retrieval for forum posts",
    long_about = "Burrow embeds forum posts, attaches them to semantically similar tags (minting a new \
                  tag when nothing matches), records which tags co-occur, and answers free-text \
                  queries with the best matching tags and their posts."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/burrow/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tag and store a new post
    Ingest {
        /// Post title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Post body
        #[arg(short = 'b', long)]
        content: String,

        /// Print the stored post as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the tags matching a query and the posts carrying them
    Search {
        /// Search query text
        query: String,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Nearest neighbours straight from the vector store
    Similar {
        /// Search query text
        query: String,

        /// Maximum number of hits (defaults to retrieval.store_search_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Re-embed every tag and post into the vector store
    Sync,

    /// Load a seed snapshot into the graph
    Import {
        /// Seed JSON file
        file: PathBuf,
    },

    /// Write the graph as a seed snapshot
    Export {
        /// Output JSON file
        output: PathBuf,
    },

    /// List tags in creation order
    Tags {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show the tags that co-occur with a tag
    Related {
        /// Tag id
        tag_id: String,
    },

    /// Print the tag graph as `{ nodes, links }` JSON
    Graph {
        /// Maximum number of links
        #[arg(short, long, default_value = "200")]
        limit: usize,
    },

    /// Show graph and database statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the default configuration path
    Path,
}

impl Commands {
    /// Whether the command changes the graph
    pub fn mutates_graph(&self) -> bool {
        matches!(self, Commands::Ingest { .. } | Commands::Import { .. })
    }

    /// Whether the command depends on what is already in the vector store
    pub fn reads_vector_store(&self, config: &Config) -> bool {
        match self {
            Commands::Similar { .. } => true,
            Commands::Ingest { .. } => config.vector_store.sync_on_ingest,
            _ => false,
        }
    }
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "burrow", "ingest", "--title", "Cats", "--content", "Cats are great pets",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest { title, content, json } => {
                assert_eq!(title, "Cats");
                assert_eq!(content, "Cats are great pets");
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["burrow", "stats", "-v", "--config", "/tmp/b.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/b.toml")));
    }

    #[test]
    fn test_store_reading_commands() {
        let mut config = Config::default();
        let similar = Cli::try_parse_from(["burrow", "similar", "x"]).unwrap();
        let ingest = Cli::try_parse_from(["burrow", "ingest", "-b", "x"]).unwrap();
        let sync = Cli::try_parse_from(["burrow", "sync"]).unwrap();

        assert!(similar.command.reads_vector_store(&config));
        assert!(!ingest.command.reads_vector_store(&config));
        assert!(!sync.command.reads_vector_store(&config));

        config.vector_store.sync_on_ingest = true;
        assert!(ingest.command.reads_vector_store(&config));
    }

    #[test]
    fn test_mutating_commands() {
        let ingest = Cli::try_parse_from(["burrow", "ingest", "-b", "x"]).unwrap();
        let search = Cli::try_parse_from(["burrow", "search", "x"]).unwrap();
        let import = Cli::try_parse_from(["burrow", "import", "seed.json"]).unwrap();
        assert!(ingest.command.mutates_graph());
        assert!(import.command.mutates_graph());
        assert!(!search.command.mutates_graph());
    }
}
