pub mod agent;
pub mod chat;
pub mod core;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod tickets;
pub mod vector_math;

#[cfg(test)]
pub(crate) mod test_support;
