use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open vector store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("Failed to initialize ticket client: {0}")]
    Tickets(#[source] anyhow::Error),

    #[error("Failed to initialize ingestion: {0}")]
    Ingest(#[source] anyhow::Error),
}
