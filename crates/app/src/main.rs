use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use policy_rag_core::stores::ollama::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use policy_rag_core::{
    CharacterNgramEmbedder, ChatModel, Embedder, FlatIndexStore, IndexingPipeline, OllamaChatModel,
    OllamaClient, OllamaEmbedder, PipelineError, PipelineOptions, QueryPipeline, Workspace,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "policy-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the vector index and the upload scratch area
    #[arg(long, env = "POLICY_RAG_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model used for both indexing and querying
    #[arg(long, env = "POLICY_RAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Chat model that produces the claim decision
    #[arg(long, env = "POLICY_RAG_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Ollama)]
    embedder: EmbedderKind,

    /// Timeout for each request to the model server
    #[arg(long, default_value = "120")]
    request_timeout_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Embeddings from the Ollama server.
    Ollama,
    /// Offline character-trigram hashing, no server needed.
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Index a PDF policy, replacing any previously indexed document.
    Upload {
        /// PDF file to index.
        #[arg(long)]
        file: PathBuf,
    },
    /// Ask a claims question and print the structured decision.
    Query {
        #[arg(long)]
        question: String,
        /// Also print the retrieved clauses and the raw model output.
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
    /// Print the clauses retrieved for a question without calling the chat model.
    Search {
        #[arg(long)]
        question: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Show which document is currently indexed.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {failure:#}");
            match failure.downcast_ref::<PipelineError>() {
                Some(pipeline) if pipeline.is_client_error() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        data_dir = %cli.data_dir.display(),
        "policy-rag boot"
    );

    let options = PipelineOptions::default();
    let workspace = Workspace::under(&cli.data_dir);
    let client = OllamaClient::new(
        &cli.ollama_url,
        Duration::from_secs(cli.request_timeout_secs),
    )?;
    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(
            client.clone(),
            cli.embedding_model.clone(),
        )),
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    let chat: Arc<dyn ChatModel> = Arc::new(OllamaChatModel::new(client, cli.chat_model.clone()));

    match cli.command {
        Command::Upload { file } => {
            let indexing = IndexingPipeline::new(
                workspace,
                FlatIndexStore::new(),
                embedder,
                options,
            )?;
            let bytes = tokio::fs::read(&file).await?;
            let filename = display_name(&file);

            let receipt = indexing.index(&bytes, &filename).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Query { question, explain } => {
            let query = QueryPipeline::new(workspace, FlatIndexStore::new(), embedder, chat, options);

            let trace = query.answer_with_trace(&question).await.map_err(|failure| {
                if !failure.is_client_error() {
                    error!(%failure, "query failed");
                }
                failure
            })?;

            if explain {
                for hit in &trace.hits {
                    println!(
                        "[page {}] chunk={} score={:.4}\n{}\n",
                        hit.chunk.page, hit.chunk.chunk_index, hit.score, hit.chunk.text
                    );
                }
                println!("raw_response:\n{}\n", trace.raw_response);
            }
            println!("{}", serde_json::to_string_pretty(&trace.answer)?);
        }
        Command::Search { question, top_k } => {
            let query = QueryPipeline::new(workspace, FlatIndexStore::new(), embedder, chat, options);

            let hits = query.retrieve(&question, top_k).await?;
            println!("query: {question}");
            for hit in hits {
                println!(
                    "[page {}] score={:.4} chunk={}",
                    hit.chunk.page, hit.score, hit.chunk.chunk_index
                );
                println!("  chunk_text:\n{}", hit.chunk.text);
            }
        }
        Command::Status => {
            let query = QueryPipeline::new(workspace, FlatIndexStore::new(), embedder, chat, options);

            match query.status().await? {
                Some(manifest) => println!("{}", serde_json::to_string_pretty(&manifest)?),
                None => println!("no document indexed"),
            }
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
