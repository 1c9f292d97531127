//! Typed configuration sections.
//!
//! Every field has a default so a missing `config.yml` still yields a usable
//! configuration; secrets normally arrive through the environment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub company: CompanyConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub github: GitHubConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: "Hyundai".to_string(),
            email: "ipinfo@hyundai.com".to_string(),
            phone: "+000 00 000 00 00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4.1-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Cosine distance above which the best hit counts as "not found".
    pub not_found_distance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            not_found_distance: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub docs_dir: String,
    pub collection: String,
    pub max_tokens: usize,
    pub overlap: usize,
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            docs_dir: "files".to_string(),
            collection: "support_docs".to_string(),
            max_tokens: 260,
            overlap: 40,
            batch_size: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// `owner/name`
    pub repo: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            repo: None,
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_allowed_origins: Vec::new(),
        }
    }
}
