use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_rag_core::providers::openai::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use pdf_rag_core::stores::pinecone::DEFAULT_CONTROLLER_URL;
use pdf_rag_core::stores::qdrant::DEFAULT_QDRANT_URL;
use pdf_rag_core::{
    list_pdf_files, save_upload, Answer, ChunkingConfig, Embedder, ExtractionPolicy, IndexSpec,
    IndexingReport, LopdfExtractor, Metric, OpenAiChat, OpenAiEmbedder, PineconeStore,
    QdrantStore, RagConfig, RagCoordinator, RetryPolicy, ServerlessSpec, VectorStore,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Pinecone,
    Qdrant,
}

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder holding the PDFs to index
    #[arg(long, env = "DOCS_FOLDER", default_value = "docs")]
    docs_folder: PathBuf,

    /// API key for the embedding and chat service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    openai_base_url: String,

    /// Embedding model
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Chat completion model
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Vector database backend
    #[arg(long, value_enum, default_value = "pinecone")]
    backend: Backend,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: Option<String>,

    /// Pinecone control plane URL
    #[arg(long, default_value = DEFAULT_CONTROLLER_URL)]
    pinecone_url: String,

    /// Cloud for a newly created serverless index
    #[arg(long, default_value = "aws")]
    pinecone_cloud: String,

    /// Region for a newly created serverless index
    #[arg(long, default_value = "us-east-1")]
    pinecone_region: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    qdrant_url: String,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    /// Index (or collection) name
    #[arg(long, env = "INDEX_NAME", default_value = "association-docs")]
    index_name: String,

    /// Embedding width; must match the embedding model
    #[arg(long, default_value = "1536")]
    dimensions: usize,

    /// Words per chunk
    #[arg(long, default_value = "500")]
    chunk_words: usize,

    /// Vectors per upsert request
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Attempts per embedding request
    #[arg(long, default_value = "3")]
    max_attempts: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Keep indexing when a PDF cannot be read
    #[arg(long, default_value_t = false)]
    skip_unreadable: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Re-index every PDF in the document folder.
    Index,
    /// Ask one question grounded on the indexed documents.
    Ask {
        /// Question text
        #[arg(long)]
        question: String,
        /// Number of chunks used as context.
        #[arg(long, default_value = "3")]
        top_k: usize,
        /// Print the retrieved chunks.
        #[arg(long, default_value_t = false)]
        show_sources: bool,
    },
    /// Print the number of vectors in the index.
    Stats,
    /// List PDFs in the document folder.
    Files,
    /// Copy a PDF into the document folder.
    Upload {
        /// Local PDF to add
        #[arg(long)]
        file: PathBuf,
        /// Re-index after the copy.
        #[arg(long, default_value_t = false)]
        index: bool,
    },
    /// Interactive loop: type a question, `upload` to re-index, `quit` to leave.
    Repl,
}

fn build_config(cli: &Cli) -> anyhow::Result<RagConfig> {
    let openai_api_key = cli
        .openai_api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is required"))?;

    let config = RagConfig {
        openai_api_key,
        openai_base_url: cli.openai_base_url.clone(),
        embedding_model: cli.embedding_model.clone(),
        chat_model: cli.chat_model.clone(),
        request_timeout: Duration::from_secs(cli.timeout_secs),
        docs_folder: cli.docs_folder.clone(),
        index: IndexSpec {
            name: cli.index_name.clone(),
            dimension: cli.dimensions,
            metric: Metric::Cosine,
        },
        chunking: ChunkingConfig::new(cli.chunk_words)?,
        upsert_batch_size: cli.batch_size,
        retry: RetryPolicy {
            max_attempts: cli.max_attempts,
            ..RetryPolicy::default()
        },
        extraction_policy: if cli.skip_unreadable {
            ExtractionPolicy::SkipUnreadable
        } else {
            ExtractionPolicy::Abort
        },
        ..RagConfig::default()
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match &cli.command {
        Command::Files => {
            let files = list_pdf_files(&cli.docs_folder)?;
            if files.is_empty() {
                println!("no pdf files in {}", cli.docs_folder.display());
            }
            for file in files {
                println!("{file}");
            }
            return Ok(());
        }
        Command::Upload { file, index: false } => {
            upload_file(&cli.docs_folder, file)?;
            return Ok(());
        }
        _ => {}
    }

    let config = build_config(&cli)?;
    let embedder = OpenAiEmbedder::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.embedding_model.clone(),
        config.index.dimension,
        config.request_timeout,
    )?;
    let chat = OpenAiChat::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.chat_model.clone(),
        config.request_timeout,
    )?;

    match cli.backend {
        Backend::Pinecone => {
            let api_key = cli
                .pinecone_api_key
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("PINECONE_API_KEY is required"))?;
            let store = PineconeStore::new(
                api_key,
                &cli.pinecone_url,
                config.index.name.clone(),
                ServerlessSpec {
                    cloud: cli.pinecone_cloud.clone(),
                    region: cli.pinecone_region.clone(),
                },
                config.request_timeout,
            )?;
            run(&cli.command, config, embedder, store, chat).await
        }
        Backend::Qdrant => {
            let store = QdrantStore::new(
                cli.qdrant_url.clone(),
                config.index.name.clone(),
                cli.qdrant_api_key.as_deref(),
                config.request_timeout,
            )?;
            run(&cli.command, config, embedder, store, chat).await
        }
    }
}

async fn run<E, S>(
    command: &Command,
    config: RagConfig,
    embedder: E,
    store: S,
    chat: OpenAiChat,
) -> anyhow::Result<()>
where
    E: Embedder,
    S: VectorStore,
{
    let docs_folder = config.docs_folder.clone();
    let rag = RagCoordinator::connect(config, embedder, store, chat, Box::new(LopdfExtractor)).await?;

    match command {
        Command::Index => {
            let report = rag.index_documents().await?;
            print_report(&report);
        }
        Command::Ask {
            question,
            top_k,
            show_sources,
        } => {
            let answer = rag.ask_with_top_k(question, *top_k).await?;
            print_answer(&answer, *show_sources);
        }
        Command::Stats => {
            let stats = rag.stats().await?;
            println!("vector_count: {}", stats.total_vector_count);
        }
        Command::Upload { file, .. } => {
            upload_file(&docs_folder, file)?;
            let report = rag.index_documents().await?;
            print_report(&report);
        }
        Command::Repl => repl(&rag).await?,
        Command::Files => {}
    }

    Ok(())
}

fn upload_file(folder: &Path, file: &Path) -> anyhow::Result<()> {
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("not a file: {}", file.display()))?;
    let bytes = std::fs::read(file)?;
    let stored = save_upload(folder, name, &bytes)?;
    println!("file \"{stored}\" uploaded to {}", folder.display());
    Ok(())
}

fn print_report(report: &IndexingReport) {
    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
    }
    println!(
        "{} vectors from {} pages in {} files uploaded in {} batches at {}",
        report.vectors,
        report.pages,
        report.files,
        report.batches,
        report.completed_at.to_rfc3339()
    );
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.text);
    if show_sources {
        for hit in &answer.matches {
            let (source, page) = hit
                .metadata
                .as_ref()
                .map(|metadata| (metadata.source.as_str(), metadata.page))
                .unwrap_or_default();
            println!("[{source} p{page}] score={:.4} id={}", hit.score, hit.id);
        }
    }
}

async fn repl<E, S>(rag: &RagCoordinator<E, S, OpenAiChat>) -> anyhow::Result<()>
where
    E: Embedder,
    S: VectorStore,
{
    println!("=== Document Chatbot ===");
    println!("Commands:");
    println!("  'upload' - index documents from {}", rag.config().docs_folder.display());
    println!("  'quit' or 'exit' - leave");
    println!("  or just type your question!\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "upload" => {
                println!("Indexing documents...");
                match rag.index_documents().await {
                    Ok(report) => print_report(&report),
                    Err(error) => println!("Error indexing documents: {error}"),
                }
            }
            _ => {
                println!("Thinking...");
                match rag.ask(input).await {
                    Ok(answer) => println!("\nAssistant: {}\n", answer.text),
                    Err(error) => println!("Error: {error}\n"),
                }
            }
        }
    }

    Ok(())
}
