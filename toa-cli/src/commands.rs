//! Subcommand handlers.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use toa_rag::openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
use toa_rag::prompts::EXAMPLE_PETITION;
use toa_rag::{
    ApproachExplorer, CitationQueryEngine, EmbeddingProvider, EngineConfig, HashEmbeddingProvider,
    IndexBuilder, RecursiveChunker, Retriever, StorageContext, TextGenerator,
};
use tracing::info;

use crate::args::{Cli, Commands, EmbedderKind, ProviderArgs};
use crate::input::{load_approaches, load_documents, read_text};

/// Run the parsed command line.
///
/// Providers are built, and the index loaded, only by the subcommands that use them.
pub async fn run(cli: Cli) -> Result<()> {
    let providers = &cli.providers;
    let config = cli.engine.config(&configured_model(providers))?;

    match cli.command {
        Commands::Inspect => inspect(&config),
        Commands::Retrieve { query } => {
            let storage = load_storage(&config)?;
            let retriever = Retriever::from_storage(&storage, build_embedder(providers)?, &config)?;
            print_json(&retriever.retrieve(&query).await?)
        }
        Commands::Query { query, json } => {
            let engine = engine(&config, providers, build_generator(providers)?)?;
            let answer = engine.query(&query).await?;
            if json {
                print_json(&answer)
            } else {
                println!("{}", answer.render());
                Ok(())
            }
        }
        Commands::Petition { situation, example, jurisdiction } => {
            let example = match example {
                Some(path) => read_text(&path)?,
                None => EXAMPLE_PETITION.to_string(),
            };
            let explorer =
                ApproachExplorer::new(build_generator(providers)?).with_jurisdiction(jurisdiction);
            println!("{}", explorer.draft_petition(&situation, &example).await?);
            Ok(())
        }
        Commands::Approaches { petition, jurisdiction } => {
            let petition = read_text(&petition)?;
            let explorer =
                ApproachExplorer::new(build_generator(providers)?).with_jurisdiction(jurisdiction);
            print_json(&explorer.derive_approaches(&petition).await?)
        }
        Commands::Resolve { petition, approaches, jurisdiction } => {
            let petition = read_text(&petition)?;
            let approaches = load_approaches(&approaches)?;
            let generator = build_generator(providers)?;
            let engine = engine(&config, providers, Arc::clone(&generator))?;
            let explorer = ApproachExplorer::new(generator)
                .with_engine(Arc::new(engine))
                .with_jurisdiction(jurisdiction);
            print_json(&explorer.resolve_all(&petition, &approaches).await?)
        }
        Commands::BuildIndex { input, index_id, chunk_size, chunk_overlap } => {
            let documents = load_documents(&input)?;
            let builder = IndexBuilder::builder()
                .embedding_provider(build_embedder(providers)?)
                .chunker(Arc::new(RecursiveChunker::new(chunk_size, chunk_overlap)))
                .index_id(index_id)
                .build()?;
            let storage = builder.build(&documents).await?;
            storage.persist(&config.persist_dir)?;
            info!(
                path = %config.persist_dir.display(),
                document_count = documents.len(),
                chunk_count = storage.chunk_count(),
                "index written"
            );
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct IndexSummary<'a> {
    persist_dir: String,
    index_id: &'a str,
    embedding_model: &'a str,
    dimensions: usize,
    document_count: usize,
    chunk_count: usize,
}

fn inspect(config: &EngineConfig) -> Result<()> {
    let storage = load_storage(config)?;
    let index_store = storage.index_store();
    print_json(&IndexSummary {
        persist_dir: config.persist_dir.display().to_string(),
        index_id: index_store.index_id(),
        embedding_model: index_store.embedding_model(),
        dimensions: index_store.dimensions(),
        document_count: index_store.document_count(),
        chunk_count: storage.chunk_count(),
    })
}

fn load_storage(config: &EngineConfig) -> Result<StorageContext> {
    StorageContext::load(&config.persist_dir)
        .with_context(|| format!("failed to load index from {}", config.persist_dir.display()))
}

fn engine(
    config: &EngineConfig,
    providers: &ProviderArgs,
    generator: Arc<dyn TextGenerator>,
) -> Result<CitationQueryEngine> {
    let storage = load_storage(config)?;
    let embedder = build_embedder(providers)?;
    Ok(CitationQueryEngine::from_storage(&storage, embedder, generator, config.clone())?)
}

/// Identifier of the embedding model the selected provider serves.
fn configured_model(providers: &ProviderArgs) -> String {
    match providers.embedder {
        EmbedderKind::Hash => {
            HashEmbeddingProvider::new(providers.hash_dimensions).model().to_string()
        }
        EmbedderKind::Openai => providers.embedding_model.clone(),
    }
}

fn api_key(providers: &ProviderArgs) -> Result<String> {
    providers
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set for the OpenAI provider"))
}

/// The query-time embedder; must match the one the index was built with.
pub fn build_embedder(providers: &ProviderArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    match providers.embedder {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbeddingProvider::new(providers.hash_dimensions))),
        EmbedderKind::Openai => {
            let mut provider = OpenAIEmbeddingProvider::new(api_key(providers)?)?
                .with_model(&providers.embedding_model);
            if let Some(base_url) = &providers.openai_base_url {
                provider = provider.with_base_url(base_url);
            }
            Ok(Arc::new(provider))
        }
    }
}

fn build_generator(providers: &ProviderArgs) -> Result<Arc<dyn TextGenerator>> {
    let mut generator =
        OpenAIGenerator::new(api_key(providers)?)?.with_model(&providers.chat_model);
    if let Some(base_url) = &providers.openai_base_url {
        generator = generator.with_base_url(base_url);
    }
    Ok(Arc::new(generator))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn openai_embedder_requires_a_key() {
        let mut parsed = cli(&["toa", "inspect", "--embedder", "openai"]);
        parsed.providers.openai_api_key = None;
        assert!(build_embedder(&parsed.providers).is_err());
    }

    #[tokio::test]
    async fn builds_then_inspects_and_retrieves_offline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cases.jsonl");
        let lines = [
            serde_json::json!({
                "id": "case-1",
                "text": "Dowry harassment conviction upheld.",
                "metadata": { "case_number": "CrA 7/2011" },
            }),
            serde_json::json!({
                "id": "case-2",
                "text": "Land acquisition compensation enhanced.",
            }),
        ];
        let jsonl: String = lines.iter().map(|line| format!("{line}\n")).collect();
        std::fs::write(&input, jsonl).unwrap();
        let storage_dir = dir.path().join("storage");
        let storage_arg = storage_dir.to_str().unwrap();
        let input_arg = input.to_str().unwrap();

        let common =
            ["--embedder", "hash", "--hash-dimensions", "256", "--persist-dir", storage_arg];
        let mut build = vec!["toa", "build-index", "--input", input_arg];
        build.extend(common);
        run(cli(&build)).await.unwrap();

        // Inspecting reads the stores only, so no API key is needed.
        let mut inspect =
            cli(&["toa", "inspect", "--embedder", "openai", "--persist-dir", storage_arg]);
        inspect.providers.openai_api_key = None;
        run(inspect).await.unwrap();

        let storage = StorageContext::load(&storage_dir).unwrap();
        assert_eq!(storage.chunk_count(), 2);
        assert_eq!(storage.index_store().embedding_model(), "hash-256");

        let mut retrieve = vec!["toa", "retrieve", "--query", "dowry harassment"];
        retrieve.extend(common);
        run(cli(&retrieve)).await.unwrap();
    }
}
