//! Command-line tooling: PDF conversion, ingestion, probes and local chat
//!
//! Run with: cargo run -p afrohistorian --bin afrohistorian -- --help

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afrohistorian::{
    config::RagConfig,
    generation::{AnswerEngine, CancellationToken},
    ingestion::{ingest_text_file, pdf_to_txt, SemanticChunker},
    providers::Providers,
    server::RagServer,
    types::ChunkMetadata,
};

#[derive(Parser)]
#[command(name = "afrohistorian")]
#[command(about = "Afrohistorian RAG tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a PDF book into a text file holding its core content
    Convert {
        /// PDF to convert
        pdf: PathBuf,
        /// Output path (defaults to the PDF path with a .txt extension)
        output: Option<PathBuf>,
    },
    /// Chunk a .txt file, embed it and upload it to the vector index
    Ingest {
        /// Text file to ingest
        file: PathBuf,
        /// Source recorded with every chunk (defaults to the file path)
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "Multiple")]
        author: String,
        #[arg(long, default_value = "West African History")]
        title: String,
        #[arg(long, default_value = "2018")]
        year: String,
    },
    /// Check that the vector index answers queries
    Check,
    /// Ask a single question
    Ask {
        /// The question
        question: String,
    },
    /// Interactive chat with streamed answers
    Chat,
    /// Run the HTTP and WebSocket server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "afrohistorian=debug,tower_http=debug"
    } else {
        "afrohistorian=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Convert { pdf, output } => convert(pdf, output),
        Command::Ingest {
            file,
            source,
            author,
            title,
            year,
        } => {
            let metadata = ChunkMetadata {
                source: source.unwrap_or_else(|| file.display().to_string()),
                author,
                title: Some(title),
                year: Some(year),
            };
            ingest(&config, file, metadata).await
        }
        Command::Check => check(&config).await,
        Command::Ask { question } => ask(&config, &question).await,
        Command::Chat => chat(&config).await,
        Command::Serve => RagServer::new(config)?.start().await.map_err(Into::into),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn convert(pdf: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    if !pdf.exists() {
        bail!("File {} not found", pdf.display());
    }

    let pb = spinner(&format!("Converting {}", pdf.display()));
    let result = pdf_to_txt(&pdf, output.as_deref());
    pb.finish_and_clear();

    let conversion = result.with_context(|| format!("Error converting {}", pdf.display()))?;
    println!(
        "{} Converted {} to {}",
        style("✓").green(),
        pdf.display(),
        conversion.output_path.display()
    );
    println!("  Extracted {} characters of core content", conversion.chars);
    Ok(())
}

async fn ingest(config: &RagConfig, file: PathBuf, metadata: ChunkMetadata) -> anyhow::Result<()> {
    println!("Accessing {} for text input...", style(file.display()).bold());

    let providers = Providers::from_config(config)?;
    let chunker = SemanticChunker::new(providers.embedder.clone(), &config.chunking);

    let pb = spinner("Chunking, embedding and uploading");
    let result = ingest_text_file(
        &file,
        Some(metadata),
        &chunker,
        providers.embedder.as_ref(),
        providers.vector_store.as_ref(),
    )
    .await;
    pb.finish_and_clear();

    let report = result.context("Error uploading chunks to the vector index")?;
    println!(
        "{} Successfully uploaded {} chunks ({} vectors written)",
        style("✓").green(),
        report.chunks,
        report.upserted
    );
    Ok(())
}

async fn check(config: &RagConfig) -> anyhow::Result<()> {
    let engine = AnswerEngine::from_config(config)?;

    let pb = spinner("Querying the vector index");
    let result = engine.check_vector_store().await;
    pb.finish_and_clear();

    if !result.is_success() {
        bail!(
            "Error accessing the vector store: {}",
            result.error.unwrap_or_default()
        );
    }

    println!("{} Vector store is accessible.", style("✓").green());
    println!("Vector store returned the following results:");
    for hit in &result.results {
        println!(
            "  [{:.3}] {} ({})",
            hit.similarity,
            hit.chunk.text.chars().take(120).collect::<String>(),
            hit.chunk.metadata.source
        );
    }
    Ok(())
}

async fn ask(config: &RagConfig, question: &str) -> anyhow::Result<()> {
    let engine = AnswerEngine::from_config(config)?;

    let pb = spinner(&format!("{} is thinking...", engine.assistant_name()));
    let answer = engine.answer(question).await;
    pb.finish_and_clear();

    match answer.response {
        Some(text) => {
            println!("{} says: {}", style(engine.assistant_name()).cyan().bold(), text);
            Ok(())
        }
        None => bail!(answer.message),
    }
}

async fn chat(config: &RagConfig) -> anyhow::Result<()> {
    let engine = AnswerEngine::from_config(config)?;
    let name = engine.assistant_name().to_string();
    let stdin = io::stdin();

    print!("What is your name?\n> ");
    io::stdout().flush()?;
    let mut user = String::new();
    stdin.lock().read_line(&mut user)?;
    println!("Hello, {}! Type 'exit' to leave.", style(user.trim()).bold());

    loop {
        print!("\n{} ", style("?").yellow());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        print!("{} ", style(format!("{}:", name)).cyan().bold());
        let mut chunks = engine.answer_stream(question, CancellationToken::new());
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    print!("{}", text);
                    io::stdout().flush()?;
                }
                Err(e) => {
                    println!();
                    eprintln!("{} {}", style("error:").red().bold(), e);
                }
            }
        }
        println!();
    }

    println!("Goodbye!");
    Ok(())
}
