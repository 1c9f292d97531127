use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use helpdesk_rag::core::config::AppPaths;
use helpdesk_rag::core::logging;
use helpdesk_rag::rag::{build_context, RagStore, NO_MATCH_DISTANCE};
use helpdesk_rag::server;
use helpdesk_rag::state::AppState;

const PREVIEW_HITS: usize = 2;
const PREVIEW_CHARS: usize = 1200;

#[derive(Parser)]
#[command(name = "helpdesk", version, about = "Customer support chat over PDF manuals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chat page and JSON API (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Index every PDF in the documents directory
    Ingest,
    /// Show the nearest chunks for a query
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Ask a single question and print the answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths.log_dir);
    let state = AppState::initialize(paths).await?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(state, host, port).await,
        Command::Ingest => ingest(&state).await,
        Command::Search { query, k } => search(&state, &query, k).await,
        Command::Ask { question } => ask(&state, &question.join(" ")).await,
    }
}

async fn serve(
    state: Arc<AppState>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let bind_addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    let indexed = state.store.count().await.unwrap_or(0);
    if indexed == 0 {
        tracing::warn!("Vector index is empty; run `helpdesk ingest` first");
    }

    println!("Customer support chat on http://{}", addr);
    tracing::info!("Listening on {}", addr);

    let app = server::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn ingest(state: &AppState) -> anyhow::Result<()> {
    println!("Ingesting PDFs from {}", state.ingestor.docs_dir().display());
    let report = state.ingestor.run().await?;

    for skipped in &report.skipped {
        println!("  skipped {} (unreadable)", skipped);
    }
    println!(
        "Done: {} chunks from {} pages in {} file(s).",
        report.chunks, report.pages, report.files
    );
    Ok(())
}

async fn search(state: &AppState, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    let k = k.unwrap_or(state.config.retrieval.top_k).max(1);
    let hits = state.retriever.retrieve(query, k).await?;
    let threshold = state.retriever.threshold();

    if hits.is_empty() {
        println!(
            "No results (best distance {}). Is the index empty?",
            NO_MATCH_DISTANCE
        );
        return Ok(());
    }

    println!("Top distances (not-found threshold {}):", threshold);
    for (i, hit) in hits.iter().enumerate() {
        let page = hit
            .chunk
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {}. {:.4}  {} (page {})",
            i + 1,
            hit.distance,
            hit.chunk.source,
            page
        );
    }

    let preview_len = hits.len().min(PREVIEW_HITS);
    let context = build_context(&hits[..preview_len]);
    println!("\nContext preview:\n{}", truncate_chars(&context, PREVIEW_CHARS));
    Ok(())
}

async fn ask(state: &AppState, question: &str) -> anyhow::Result<()> {
    let turn = state.chat.send(None, question).await?;

    println!("{}", turn.answer);
    if !turn.sources.is_empty() {
        println!("\n{}", turn.sources);
    }
    for ticket in &turn.tickets {
        println!("\nTicket: {}", serde_json::to_string(ticket)?);
    }
    Ok(())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
