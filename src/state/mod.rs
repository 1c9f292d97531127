use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::{system_prompt, SupportAgent, ToolExecutor};
use crate::chat::{ChatService, SessionStore};
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::ingest::Ingestor;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{RagStore, Retriever, SqliteRagStore};
use crate::tickets::GitHubTickets;

pub mod error;

use error::InitializationError;

/// Everything the HTTP handlers and CLI commands share.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config_service: ConfigService,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RagStore>,
    pub retriever: Retriever,
    pub ingestor: Arc<Ingestor>,
    pub chat: ChatService,
    /// Held for the duration of an ingestion run.
    pub ingest_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Loads configuration under `paths` and wires up the OpenAI provider,
    /// the vector store and the support agent.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let provider: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(&config.openai)
                .map_err(|e| InitializationError::Provider(e.into()))?,
        );

        Self::build(paths, config_service, config, provider).await
    }

    /// Builds the state around an already constructed provider.
    pub async fn build(
        paths: Arc<AppPaths>,
        config_service: ConfigService,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let store: Arc<dyn RagStore> = Arc::new(
            SqliteRagStore::open(paths.rag_db_path(), &config.ingest.collection)
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        let embedding_model = config.openai.embedding_model.clone();
        let retriever = Retriever::new(
            provider.clone(),
            store.clone(),
            embedding_model.clone(),
            config.retrieval.clone(),
        );

        let ingestor = Ingestor::new(
            provider.clone(),
            store.clone(),
            paths.resolve(&config.ingest.docs_dir),
            embedding_model,
            &config.ingest,
        )
        .map_err(|e| InitializationError::Ingest(e.into()))?;

        let tickets = GitHubTickets::new(&config.github)
            .map_err(|e| InitializationError::Tickets(e.into()))?;
        if !tickets.is_configured() {
            tracing::warn!("GITHUB_TOKEN or GITHUB_REPO not set; ticket creation will fail");
        }

        let agent = SupportAgent::new(
            provider.clone(),
            ToolExecutor::new(retriever.clone(), tickets),
            config.openai.chat_model.clone(),
            config.agent.max_tool_rounds,
        );
        let prompt = system_prompt(&config.company, config.retrieval.not_found_distance);
        let chat = ChatService::new(agent, SessionStore::new(), prompt);

        tracing::info!(
            "Using {} (chat: {}, embeddings: {})",
            provider.name(),
            config.openai.chat_model,
            config.openai.embedding_model
        );

        Ok(Arc::new(AppState {
            paths,
            config_service,
            config: Arc::new(config),
            store,
            retriever,
            ingestor: Arc::new(ingestor),
            chat,
            ingest_lock: Arc::new(Mutex::new(())),
        }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::llm::ChatCompletion;
    use crate::test_support::ScriptedProvider;

    /// State rooted in a temp dir with a scripted provider.
    pub async fn state(
        dir: &tempfile::TempDir,
        script: Vec<ChatCompletion>,
    ) -> (Arc<AppState>, Arc<ScriptedProvider>) {
        let paths = Arc::new(AppPaths::with_data_dir(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));
        let provider = Arc::new(ScriptedProvider::new(script));
        let state = AppState::build(
            paths.clone(),
            ConfigService::new(paths),
            AppConfig::default(),
            provider.clone(),
        )
        .await
        .unwrap();
        (state, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_uses_the_given_paths() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let paths = Arc::new(AppPaths::with_data_dir(dir.path().to_path_buf(), data_dir.clone()));
        std::fs::write(&paths.secrets_path, "openai:\n  api_key: sk-test\n").unwrap();

        let state = AppState::initialize(paths).await.unwrap();

        assert_eq!(state.paths.user_data_dir, data_dir);
        assert!(data_dir.join("vectorstore/rag.db").is_file());
        assert_eq!(state.ingestor.docs_dir(), dir.path().join("files").as_path());
    }
}
