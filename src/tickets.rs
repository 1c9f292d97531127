//! Support tickets filed as GitHub issues.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::config::GitHubConfig;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketRequest {
    pub name: String,
    pub email: String,
    pub title: String,
    pub description: String,
}

/// Result reported back to the model; failures never abort the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TicketOutcome {
    Created {
        ok: bool,
        issue_url: Option<String>,
        issue_number: Option<u64>,
    },
    Failed {
        ok: bool,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl TicketOutcome {
    fn created(issue_url: Option<String>, issue_number: Option<u64>) -> Self {
        TicketOutcome::Created {
            ok: true,
            issue_url,
            issue_number,
        }
    }

    fn failed(error: impl Into<String>, details: Option<String>) -> Self {
        TicketOutcome::Failed {
            ok: false,
            error: error.into(),
            details,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, TicketOutcome::Created { .. })
    }
}

pub fn issue_body(request: &TicketRequest) -> String {
    format!(
        "**Customer name:** {}\n**Customer email:** {}\n\n---\n\n{}",
        request.name, request.email, request.description
    )
}

#[derive(Deserialize)]
struct IssueResponse {
    html_url: Option<String>,
    number: Option<u64>,
}

#[derive(Clone)]
pub struct GitHubTickets {
    token: Option<String>,
    repo: Option<String>,
    api_base: String,
    client: Client,
}

impl GitHubTickets {
    pub fn new(config: &GitHubConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            token: non_empty(&config.token),
            repo: non_empty(&config.repo),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.repo.is_some()
    }

    pub async fn create_ticket(&self, request: &TicketRequest) -> TicketOutcome {
        let (Some(token), Some(repo)) = (&self.token, &self.repo) else {
            return TicketOutcome::failed("Missing GITHUB_TOKEN or GITHUB_REPO", None);
        };

        let url = format!("{}/repos/{}/issues", self.api_base, repo);
        let payload = json!({
            "title": request.title,
            "body": issue_body(request),
        });

        let res = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "helpdesk-rag")
            .json(&payload)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::warn!("GitHub request failed: {}", err);
                return TicketOutcome::failed(format!("GitHub request failed: {}", err), None);
            }
        };

        let status = res.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let details = res.text().await.unwrap_or_default();
            tracing::warn!("GitHub API error {}: {}", status.as_u16(), details);
            return TicketOutcome::failed(
                format!("GitHub API error {}", status.as_u16()),
                Some(details),
            );
        }

        match res.json::<IssueResponse>().await {
            Ok(issue) => {
                tracing::info!("Created GitHub issue {:?} in {}", issue.number, repo);
                TicketOutcome::created(issue.html_url, issue.number)
            }
            Err(err) => TicketOutcome::failed(format!("Invalid GitHub response: {}", err), None),
        }
    }
}

/// JSON form used in tool results.
pub fn outcome_to_value(outcome: &TicketOutcome) -> Value {
    serde_json::to_value(outcome).unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};

    fn request() -> TicketRequest {
        TicketRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            title: "Key fob not working".to_string(),
            description: "Replaced the battery, still dead.".to_string(),
        }
    }

    fn config(api_base: String) -> GitHubConfig {
        GitHubConfig {
            token: Some("ghp_test".to_string()),
            repo: Some("acme/support".to_string()),
            api_base,
            timeout_secs: 5,
        }
    }

    #[test]
    fn body_contains_customer_details_then_description() {
        assert_eq!(
            issue_body(&request()),
            "**Customer name:** Ada\n**Customer email:** ada@example.com\n\n---\n\nReplaced the battery, still dead."
        );
    }

    #[tokio::test]
    async fn missing_configuration_fails_without_network() {
        let tickets = GitHubTickets::new(&GitHubConfig {
            token: Some("  ".to_string()),
            ..GitHubConfig::default()
        })
        .unwrap();

        let outcome = tickets.create_ticket(&request()).await;

        assert!(!tickets.is_configured());
        assert_eq!(
            outcome_to_value(&outcome),
            json!({ "ok": false, "error": "Missing GITHUB_TOKEN or GITHUB_REPO" })
        );
    }

    #[tokio::test]
    async fn creates_issue_with_token_auth() {
        let app = Router::new().route(
            "/repos/:owner/:name/issues",
            post(
                |Path((owner, name)): Path<(String, String)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    assert_eq!(owner, "acme");
                    assert_eq!(name, "support");
                    assert_eq!(headers["authorization"], "token ghp_test");
                    assert_eq!(headers["accept"], "application/vnd.github+json");
                    assert_eq!(body["title"], "Key fob not working");
                    assert!(body["body"].as_str().unwrap().starts_with("**Customer name:** Ada"));
                    (
                        axum::http::StatusCode::CREATED,
                        Json(json!({ "html_url": "https://github.com/acme/support/issues/7", "number": 7 })),
                    )
                },
            ),
        );
        let base = spawn_server(app).await;
        let tickets = GitHubTickets::new(&config(base)).unwrap();

        let outcome = tickets.create_ticket(&request()).await;

        assert!(outcome.is_ok());
        assert_eq!(
            outcome_to_value(&outcome),
            json!({ "ok": true, "issue_url": "https://github.com/acme/support/issues/7", "issue_number": 7 })
        );
    }

    #[tokio::test]
    async fn api_error_carries_status_and_details() {
        let app = Router::new().route(
            "/repos/:owner/:name/issues",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "Bad credentials") }),
        );
        let base = spawn_server(app).await;
        let tickets = GitHubTickets::new(&config(base)).unwrap();

        let outcome = tickets.create_ticket(&request()).await;

        assert_eq!(
            outcome_to_value(&outcome),
            json!({ "ok": false, "error": "GitHub API error 401", "details": "Bad credentials" })
        );
    }

    #[test]
    fn ticket_arguments_reject_unknown_fields() {
        let parsed: Result<TicketRequest, _> = serde_json::from_value(json!({
            "name": "a", "email": "b", "title": "c", "description": "d", "priority": "high"
        }));
        assert!(parsed.is_err());
    }
}
