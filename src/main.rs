//! # QuantGPT CLI Application
//!
//! Command-line interface for the quant documentation RAG toolchain, one
//! subcommand per pipeline stage:
//!
//! - `scrape`: clone the tutorial repository and convert notebooks to Markdown
//! - `harvest`: crawl a documentation site into the Markdown corpus
//! - `index`: build or load the persisted vector index
//! - `query`: run one retrieval-augmented query against the index
//! - `chat`: interactive, authenticated chat session with streamed answers
//!
//! Batch subcommands log to stderr; the chat subcommand logs to a file so log
//! lines do not interleave with streamed answer tokens.

use anyhow::anyhow;
use clap::{Args, CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use quantgpt::chat::ChatSession;
use quantgpt::collector::{RepoCollector, DEFAULT_UNWANTED};
use quantgpt::engine::{make_query_engine, QueryResponse};
use quantgpt::harvester::{blog_harvester, reference_harvester, run_harvester};
use quantgpt::model::OpenAiClient;
use quantgpt::store::{ChunkOptions, VectorStore};
use quantgpt::AppConfig;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;
use tracing_subscriber::EnvFilter;

const DEFAULT_REPO_URL: &str = "https://github.com/QubitQuants/vectorbt_pro_tutorials.git";

#[derive(Parser)]
#[command(author, version, about = "RAG toolchain for quant trading documentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect the tutorial git repository and convert notebooks to Markdown
    Scrape(ScrapeArgs),

    /// Crawl a documentation site into the Markdown corpus
    Harvest(HarvestArgs),

    /// Build the vector index, or load it if it already exists
    Index(IndexArgs),

    /// Ask a single question against the index
    Query(QueryArgs),

    /// Start an interactive chat session
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Git repository to collect
    #[arg(short, long, default_value = DEFAULT_REPO_URL)]
    url: String,

    /// Local checkout path
    #[arg(short, long, default_value = "qubit_quants_vbt_repo")]
    path: PathBuf,

    /// Show nbconvert output
    #[arg(short, long)]
    verbose: bool,

    /// Keep embedded HTML blocks in the converted Markdown
    #[arg(long)]
    keep_html: bool,
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Which harvester to run
    #[arg(required = true, value_parser = ["blog", "reference"])]
    site: String,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Folder containing the Markdown corpus
    #[arg(short, long, default_value = "docs")]
    source: PathBuf,

    /// Index directory
    #[arg(long, default_value = "./index")]
    persist_dir: PathBuf,

    /// Chunk size in words
    #[arg(short, long, default_value = "1024")]
    chunk_size: usize,

    /// Overlap between consecutive chunks in words
    #[arg(short, long, default_value = "128")]
    overlap: usize,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// The question to ask
    #[arg(required = true)]
    query: String,

    /// Index directory
    #[arg(long, default_value = "./index")]
    persist_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Index directory
    #[arg(long, default_value = "./index")]
    persist_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; variables may come from the process env.
    let _ = dotenvy::dotenv();

    let _log_guard = match &cli.command {
        Some(Commands::Chat(_)) => Some(init_file_logging()?),
        _ => {
            init_stderr_logging();
            None
        }
    };

    match cli.command {
        Some(Commands::Scrape(args)) => scrape_command(args).await?,
        Some(Commands::Harvest(args)) => harvest_command(args).await?,
        Some(Commands::Index(args)) => index_command(args).await?,
        Some(Commands::Query(args)) => query_command(args).await?,
        Some(Commands::Chat(args)) => chat_command(args).await?,
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// File-based logging for the interactive session. The returned guard must
/// stay alive until exit so buffered log lines are flushed.
fn init_file_logging() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file = tracing_appender::rolling::never("logs", "chat.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[instrument]
async fn scrape_command(args: ScrapeArgs) -> anyhow::Result<()> {
    println!("Collecting {} into {}...", args.url, args.path.display());

    let collector = RepoCollector::new(&args.url, &args.path);
    collector.ensure_repo().await?;
    collector.strip_unwanted(&DEFAULT_UNWANTED).await?;
    collector
        .convert_notebooks(args.verbose, !args.keep_html)
        .await?;

    println!(
        "Markdown written to {}",
        collector.markdown_dir().display()
    );
    Ok(())
}

#[instrument]
async fn harvest_command(args: HarvestArgs) -> anyhow::Result<()> {
    let config = match args.site.as_str() {
        "blog" => blog_harvester(),
        "reference" => {
            let secret = std::env::var("VBT_PRO_SECRET_URL").map_err(|_| {
                anyhow!("VBT_PRO_SECRET_URL must be set for the reference harvester")
            })?;
            reference_harvester(&secret)
        }
        other => return Err(anyhow!("unknown harvester: {}", other)),
    };

    println!("Harvesting {}...", config.name);
    let docs = run_harvester(&config).await?;
    println!(
        "Harvested {} pages into {}",
        docs.len(),
        config.output_dir.display()
    );
    Ok(())
}

#[instrument]
async fn index_command(args: IndexArgs) -> anyhow::Result<()> {
    let client = OpenAiClient::new_openai_from_env()?;

    let options = ChunkOptions {
        chunk_size: args.chunk_size,
        overlap: args.overlap,
    };
    let store = VectorStore::build_or_load(
        &args.persist_dir,
        &args.source,
        options,
        client.embedding(),
    )
    .await?;

    println!(
        "Index ready at {}: {} nodes, {} dimensions",
        args.persist_dir.display(),
        store.node_count(),
        store.manifest().ndims
    );
    Ok(())
}

#[instrument]
async fn query_command(args: QueryArgs) -> anyhow::Result<()> {
    let app = AppConfig::from_env()?;
    let store = VectorStore::load(&args.persist_dir).await?;
    let engine = make_query_engine(Arc::new(store), &app);

    match engine.query(&args.query).await? {
        QueryResponse::Streaming(mut stream) => {
            while let Some(token) = stream.next().await {
                print!("{}", token);
                std::io::stdout().flush()?;
            }
            println!();
        }
        QueryResponse::Complete(answer) => println!("{}", answer),
    }
    Ok(())
}

#[instrument]
async fn chat_command(args: ChatArgs) -> anyhow::Result<()> {
    let app = AppConfig::from_env()?;
    let store = VectorStore::load(&args.persist_dir).await?;

    let identity = quantgpt::chat::login().await?;
    let engine = make_query_engine(Arc::new(store), &app);
    let session = ChatSession::new(identity, engine);
    session.run().await?;
    Ok(())
}
