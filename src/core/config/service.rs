use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "token",
    "credential",
    "private_key",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "max_tool_rounds", "tokens"];

/// Environment variables that override file configuration, with their target path.
const ENV_OVERRIDES: [(&str, &[&str]); 10] = [
    ("COMPANY_NAME", &["company", "name"]),
    ("COMPANY_EMAIL", &["company", "email"]),
    ("COMPANY_PHONE", &["company", "phone"]),
    ("OPENAI_API_KEY", &["openai", "api_key"]),
    ("OPENAI_BASE_URL", &["openai", "base_url"]),
    ("OPENAI_CHAT_MODEL", &["openai", "chat_model"]),
    ("GITHUB_TOKEN", &["github", "token"]),
    ("GITHUB_REPO", &["github", "repo"]),
    ("HELPDESK_DOCS_DIR", &["ingest", "docs_dir"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("HELPDESK_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Files merged with secrets and environment overrides, before validation.
    pub fn load_raw(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.paths.secrets_path);
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        merged
    }

    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        parse_config(&self.load_raw())
    }

    pub fn redacted(&self) -> Value {
        redact_sensitive_values(&self.load_raw())
    }
}

/// Validates a raw configuration value and converts it into typed sections.
pub fn parse_config(raw: &Value) -> Result<AppConfig, ApiError> {
    validate_config(raw)?;
    serde_json::from_value(raw.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides(config: &mut Value, lookup: impl Fn(&str) -> Option<String>) {
    for (var, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = if var == "PORT" {
            match raw.parse::<u64>() {
                Ok(port) => Value::from(port),
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric PORT value: {}", raw);
                    continue;
                }
            }
        } else {
            Value::String(raw.to_string())
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for key in parents {
        if !current.get(*key).map(Value::is_object).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }
        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }

    if let Some(map) = current.as_object_mut() {
        map.insert((*last).to_string(), value);
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST.iter().any(|allowed| *allowed == key_lower) {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({ "a": 1, "b": { "c": 2, "d": 3 } });
        let override_value = json!({ "b": { "c": 99 }, "e": "x" });

        assert_eq!(
            deep_merge(&base, &override_value),
            json!({ "a": 1, "b": { "c": 99, "d": 3 }, "e": "x" })
        );
    }

    #[test]
    fn env_overrides_win_over_files() {
        let vars: HashMap<&str, &str> = [
            ("COMPANY_NAME", "Acme"),
            ("GITHUB_REPO", "acme/support"),
            ("PORT", "9000"),
            ("GITHUB_TOKEN", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = json!({ "company": { "name": "Old", "email": "a@b.c" } });
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config["company"]["name"], "Acme");
        assert_eq!(config["company"]["email"], "a@b.c");
        assert_eq!(config["github"]["repo"], "acme/support");
        assert_eq!(config["server"]["port"], 9000);
        assert!(config["github"].get("token").is_none());
    }

    #[test]
    fn parse_config_fills_defaults() {
        let config = parse_config(&json!({ "retrieval": { "top_k": 3 } })).unwrap();

        assert_eq!(config.retrieval.top_k, 3);
        assert!((config.retrieval.not_found_distance - 0.35).abs() < f32::EPSILON);
        assert_eq!(config.ingest.max_tokens, 260);
        assert_eq!(config.ingest.overlap, 40);
        assert_eq!(config.ingest.collection, "support_docs");
        assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
        assert_eq!(config.company.name, "Hyundai");
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "openai": { "api_key": "sk-123", "chat_model": "m" },
            "github": { "token": "ghp", "repo": "a/b" },
            "ingest": { "max_tokens": 260 }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(redacted["openai"]["api_key"], REDACT_PLACEHOLDER);
        assert_eq!(redacted["openai"]["chat_model"], "m");
        assert_eq!(redacted["github"]["token"], REDACT_PLACEHOLDER);
        assert_eq!(redacted["github"]["repo"], "a/b");
        assert_eq!(redacted["ingest"]["max_tokens"], 260);
    }

    #[test]
    fn load_config_reads_yaml_and_secrets() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        fs::write(
            tmp.path().join("config.yml"),
            "company:\n  name: Yaml Motors\nretrieval:\n  top_k: 7\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "github:\n  token: from-secrets\n").unwrap();

        let raw = {
            let service = ConfigService::new(Arc::new(paths));
            let public_config = load_yaml_file(&service.config_path());
            let secrets = load_yaml_file(&service.paths().secrets_path);
            deep_merge(&public_config, &secrets)
        };
        let config = parse_config(&raw).unwrap();

        assert_eq!(config.company.name, "Yaml Motors");
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.github.token.as_deref(), Some("from-secrets"));
    }
}
