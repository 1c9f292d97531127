use serde_json::{Map, Value};

use super::settings::IngestConfig;
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(company) = expect_optional_object(root, "company")? {
        validate_optional_string_field(company, "company.name", "name")?;
        validate_optional_string_field(company, "company.email", "email")?;
        validate_optional_string_field(company, "company.phone", "phone")?;
    }

    if let Some(openai) = expect_optional_object(root, "openai")? {
        validate_optional_string_field(openai, "openai.api_key", "api_key")?;
        validate_non_empty_string_field(openai, "openai.base_url", "base_url")?;
        validate_non_empty_string_field(openai, "openai.chat_model", "chat_model")?;
        validate_non_empty_string_field(openai, "openai.embedding_model", "embedding_model")?;
        validate_u64_field(openai, "openai.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_f64_field(
            retrieval,
            "retrieval.not_found_distance",
            "not_found_distance",
            0.0,
            2.0,
        )?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_non_empty_string_field(ingest, "ingest.docs_dir", "docs_dir")?;
        validate_non_empty_string_field(ingest, "ingest.collection", "collection")?;
        validate_u64_field(ingest, "ingest.max_tokens", "max_tokens", 1, 8_192)?;
        validate_u64_field(ingest, "ingest.overlap", "overlap", 0, 8_191)?;
        validate_u64_field(ingest, "ingest.batch_size", "batch_size", 1, 2_048)?;
        validate_window(ingest)?;
    }

    if let Some(github) = expect_optional_object(root, "github")? {
        validate_optional_string_field(github, "github.token", "token")?;
        validate_non_empty_string_field(github, "github.api_base", "api_base")?;
        validate_u64_field(github, "github.timeout_secs", "timeout_secs", 1, 600)?;
        validate_repo_field(github)?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_u64_field(agent, "agent.max_tool_rounds", "max_tool_rounds", 1, 64)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, u16::MAX as u64)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn validate_window(ingest: &Map<String, Value>) -> Result<(), ApiError> {
    let defaults = IngestConfig::default();
    let max_tokens = ingest
        .get("max_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(defaults.max_tokens as u64);
    let overlap = ingest
        .get("overlap")
        .and_then(Value::as_u64)
        .unwrap_or(defaults.overlap as u64);

    if overlap >= max_tokens {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at 'ingest.overlap': must be smaller than max_tokens ({})",
            max_tokens
        )));
    }
    Ok(())
}

fn validate_repo_field(github: &Map<String, Value>) -> Result<(), ApiError> {
    let Some(value) = github.get("repo") else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(repo) = value.as_str() else {
        return Err(config_type_error("github.repo", "string"));
    };
    let mut parts = repo.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.trim().is_empty() && !name.trim().is_empty()
    );
    if !valid {
        return Err(ApiError::BadRequest(
            "Invalid config at 'github.repo': expected 'owner/name'".to_string(),
        ));
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !number.is_finite() || number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_complete_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "company": { "name": "Acme" },
            "retrieval": { "top_k": 3, "not_found_distance": 0.4 },
            "ingest": { "max_tokens": 200, "overlap": 20 },
            "github": { "repo": "acme/support", "token": null },
            "server": { "port": 0, "cors_allowed_origins": ["http://localhost:3000"] }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_window() {
        let err = validate_config(&json!({ "ingest": { "max_tokens": 40 } })).unwrap_err();
        assert!(err.to_string().contains("ingest.overlap"));

        assert!(validate_config(&json!({ "ingest": { "max_tokens": 50, "overlap": 50 } })).is_err());
    }

    #[test]
    fn rejects_bad_threshold_and_top_k() {
        assert!(validate_config(&json!({ "retrieval": { "not_found_distance": -0.1 } })).is_err());
        assert!(validate_config(&json!({ "retrieval": { "not_found_distance": "far" } })).is_err());
        assert!(validate_config(&json!({ "retrieval": { "top_k": 0 } })).is_err());
    }

    #[test]
    fn rejects_malformed_repo() {
        assert!(validate_config(&json!({ "github": { "repo": "just-a-name" } })).is_err());
        assert!(validate_config(&json!({ "github": { "repo": "a/b/c" } })).is_err());
        assert!(validate_config(&json!({ "github": { "repo": "/b" } })).is_err());
    }

    #[test]
    fn rejects_wrong_section_types() {
        assert!(validate_config(&json!({ "agent": 3 })).is_err());
        assert!(validate_config(&json!([])).is_err());
        assert!(validate_config(&json!({ "server": { "cors_allowed_origins": [""] } })).is_err());
    }
}
