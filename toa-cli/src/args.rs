//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use toa_rag::{EngineConfig, RagError};

#[derive(Parser, Debug)]
#[command(name = "toa")]
#[command(
    about = "Tree of Approach - cited legal research over a persisted case index",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub providers: ProviderArgs,

    /// Log output format
    #[arg(
        long,
        env = "TOA_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the persisted index and print what it contains
    Inspect,

    /// Print the top-K chunks for a query
    Retrieve {
        /// Free-text query
        #[arg(short, long)]
        query: String,
    },

    /// Answer a query with citations into the retrieved chunks
    Query {
        /// Free-text query
        #[arg(short, long)]
        query: String,

        /// Print the full answer as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Draft a petition for a situation, modelled on an example petition
    Petition {
        /// Description of the legal situation
        #[arg(short, long)]
        situation: String,

        /// File holding the example petition; a bundled shareholder petition if omitted
        #[arg(short, long)]
        example: Option<PathBuf>,

        /// Jurisdiction whose law the petition relies on
        #[arg(long, default_value = "Indian")]
        jurisdiction: String,
    },

    /// Derive the tree of approaches opposing counsel might take
    Approaches {
        /// File holding the petition
        #[arg(short, long)]
        petition: PathBuf,

        /// Jurisdiction whose law the approaches target
        #[arg(long, default_value = "Indian")]
        jurisdiction: String,
    },

    /// Research statutes and precedents for every approach
    Resolve {
        /// File holding the petition
        #[arg(short, long)]
        petition: PathBuf,

        /// JSON file of approaches, as printed by `toa approaches`
        #[arg(short, long)]
        approaches: PathBuf,

        /// Jurisdiction whose law the approaches target
        #[arg(long, default_value = "Indian")]
        jurisdiction: String,
    },

    /// Build and persist an index from a JSONL file of documents
    BuildIndex {
        /// JSONL input, one `{"id", "text", "metadata"}` object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Logical name recorded in the index store
        #[arg(long, default_value = "default")]
        index_id: String,

        /// Chunk size in characters
        #[arg(long, default_value_t = 1024)]
        chunk_size: usize,

        /// Chunk overlap in characters
        #[arg(long, default_value_t = 100)]
        chunk_overlap: usize,
    },
}

/// Retrieval settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Directory holding the persisted index
    #[arg(long, env = "TOA_PERSIST_DIR", default_value = "storage", global = true)]
    pub persist_dir: PathBuf,

    /// Number of chunks retrieved per query
    #[arg(long, env = "TOA_TOP_K", default_value_t = 20, global = true)]
    pub top_k: usize,

    /// Drop retrieved chunks scoring below this value
    #[arg(long, env = "TOA_SIMILARITY_THRESHOLD", global = true)]
    pub similarity_threshold: Option<f32>,

    /// Answers memoised per process; 0 disables the cache
    #[arg(long, env = "TOA_CACHE_CAPACITY", default_value_t = 128, global = true)]
    pub cache_capacity: usize,

    /// Metadata field listed in the sources footer
    #[arg(long, env = "TOA_SOURCE_METADATA_KEY", default_value = "case_number", global = true)]
    pub source_metadata_key: String,
}

impl EngineArgs {
    /// Validated engine configuration for these arguments.
    pub fn config(&self, embedding_model: &str) -> Result<EngineConfig, RagError> {
        let mut builder = EngineConfig::builder()
            .persist_dir(&self.persist_dir)
            .top_k(self.top_k)
            .embedding_model(embedding_model)
            .cache_capacity(self.cache_capacity)
            .source_metadata_key(&self.source_metadata_key);
        if let Some(threshold) = self.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        builder.build()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// OpenAI embeddings API
    Openai,
    /// Offline hashed bag-of-words embeddings
    Hash,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Embedding and generation backends.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Embedding backend; must match the one the index was built with
    #[arg(
        long,
        env = "TOA_EMBEDDER",
        value_enum,
        default_value_t = EmbedderKind::Openai,
        global = true
    )]
    pub embedder: EmbedderKind,

    /// OpenAI embedding model
    #[arg(
        long,
        env = "TOA_EMBEDDING_MODEL",
        default_value = "text-embedding-ada-002",
        global = true
    )]
    pub embedding_model: String,

    /// Dimensions of the offline hash embedder
    #[arg(long, env = "TOA_HASH_DIMENSIONS", default_value_t = 1536, global = true)]
    pub hash_dimensions: usize,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI chat model used for answers, petitions, and approaches
    #[arg(long, env = "TOA_CHAT_MODEL", default_value = "gpt-3.5-turbo", global = true)]
    pub chat_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "TOA_OPENAI_BASE_URL", global = true)]
    pub openai_base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_query_with_global_flags() {
        let cli = Cli::try_parse_from([
            "toa",
            "query",
            "--query",
            "dowry harassment precedents",
            "--top-k",
            "5",
            "--embedder",
            "hash",
        ])
        .unwrap();
        assert_eq!(cli.engine.top_k, 5);
        assert_eq!(cli.providers.embedder, EmbedderKind::Hash);
        assert!(matches!(cli.command, Commands::Query { json: false, .. }));
    }

    #[test]
    fn petition_example_is_optional() {
        let cli =
            Cli::try_parse_from(["toa", "petition", "--situation", "breach of lease"]).unwrap();
        assert!(matches!(cli.command, Commands::Petition { example: None, .. }));
    }

    #[test]
    fn engine_config_is_validated() {
        let cli = Cli::try_parse_from(["toa", "inspect", "--top-k", "0"]).unwrap();
        assert!(cli.engine.config("text-embedding-ada-002").is_err());
    }
}
