// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Beeminder goal and datapoint endpoints.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tagtime_config::model::BeeminderConfig;
use tagtime_core::{RemoteErrorKind, RemoteFailure, TagTimeError};
use tracing::debug;

/// Maps an HTTP error status onto the remote failure taxonomy.
pub fn error_kind_for_status(status: StatusCode) -> RemoteErrorKind {
    match status.as_u16() {
        401 | 403 => RemoteErrorKind::Unauthorized,
        404 => RemoteErrorKind::NotFound,
        406 | 426 => RemoteErrorKind::ProtocolVersionMismatch,
        _ => RemoteErrorKind::Transient,
    }
}

#[derive(Debug, Serialize)]
struct CreateDatapoint<'a> {
    auth_token: &'a str,
    value: f64,
    timestamp: i64,
    comment: &'a str,
}

#[derive(Debug, Deserialize)]
struct Datapoint {
    id: String,
}

/// Beeminder API client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BeeminderClient {
    client: reqwest::Client,
    base_url: String,
}

impl BeeminderClient {
    pub fn new(config: &BeeminderConfig) -> Result<Self, TagTimeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("tagtime/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TagTimeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn goal_url(&self, user: &str, slug: &str) -> String {
        format!("{}/api/v1/users/{user}/goals/{slug}", self.base_url)
    }

    /// Fetches the goal, confirming that it exists and the token is accepted.
    pub async fn check_goal(&self, user: &str, slug: &str, token: &str) -> Result<(), RemoteFailure> {
        let response = self
            .client
            .get(format!("{}.json", self.goal_url(user, slug)))
            .query(&[("auth_token", token)])
            .send()
            .await
            .map_err(transport)?;
        expect_success(response).await.map(|_| ())
    }

    /// Creates a datapoint and returns its id.
    pub async fn create_datapoint(
        &self,
        user: &str,
        slug: &str,
        token: &str,
        value: f64,
        timestamp: i64,
        comment: &str,
    ) -> Result<String, RemoteFailure> {
        let body = CreateDatapoint {
            auth_token: token,
            value,
            timestamp,
            comment,
        };
        let response = self
            .client
            .post(format!("{}/datapoints.json", self.goal_url(user, slug)))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let text = expect_success(response).await?;
        let datapoint: Datapoint = serde_json::from_str(&text).map_err(|e| {
            RemoteFailure::new(
                RemoteErrorKind::Transient,
                format!("failed to parse datapoint response: {e}"),
            )
        })?;
        debug!(user, slug, id = %datapoint.id, "datapoint created");
        Ok(datapoint.id)
    }

    /// Deletes a datapoint by id.
    pub async fn delete_datapoint(
        &self,
        user: &str,
        slug: &str,
        token: &str,
        id: &str,
    ) -> Result<String, RemoteFailure> {
        let response = self
            .client
            .delete(format!("{}/datapoints/{id}.json", self.goal_url(user, slug)))
            .query(&[("auth_token", token)])
            .send()
            .await
            .map_err(transport)?;
        expect_success(response).await?;
        debug!(user, slug, id, "datapoint deleted");
        Ok(id.to_string())
    }
}

fn transport(e: reqwest::Error) -> RemoteFailure {
    RemoteFailure::new(RemoteErrorKind::Transient, format!("HTTP request failed: {e}"))
}

async fn expect_success(response: reqwest::Response) -> Result<String, RemoteFailure> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_success() {
        return Ok(body);
    }
    debug!(status = %status, body = %body, "Beeminder returned an error");
    Err(RemoteFailure::new(
        error_kind_for_status(status),
        format!("Beeminder returned {status}: {body}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BeeminderClient {
        BeeminderClient::new(&BeeminderConfig {
            base_url: server.uri(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            error_kind_for_status(StatusCode::UNAUTHORIZED),
            RemoteErrorKind::Unauthorized
        );
        assert_eq!(
            error_kind_for_status(StatusCode::FORBIDDEN),
            RemoteErrorKind::Unauthorized
        );
        assert_eq!(
            error_kind_for_status(StatusCode::NOT_FOUND),
            RemoteErrorKind::NotFound
        );
        assert_eq!(
            error_kind_for_status(StatusCode::UPGRADE_REQUIRED),
            RemoteErrorKind::ProtocolVersionMismatch
        );
        assert_eq!(
            error_kind_for_status(StatusCode::NOT_ACCEPTABLE),
            RemoteErrorKind::ProtocolVersionMismatch
        );
        assert_eq!(
            error_kind_for_status(StatusCode::SERVICE_UNAVAILABLE),
            RemoteErrorKind::Transient
        );
    }

    #[tokio::test]
    async fn check_goal_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/alice/goals/work.json"))
            .and(query_param("auth_token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"slug": "work"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .check_goal("alice", "work", "secret")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_returns_datapoint_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/alice/goals/work/datapoints.json"))
            .and(body_partial_json(serde_json::json!({
                "auth_token": "secret",
                "value": 0.75,
                "timestamp": 1700000000,
                "comment": "TagTime ping: work"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "5f1e",
                    "value": 0.75,
                    "timestamp": 1700000000
                })),
            )
            .mount(&server)
            .await;

        let id = client(&server)
            .create_datapoint("alice", "work", "secret", 0.75, 1_700_000_000, "TagTime ping: work")
            .await
            .unwrap();
        assert_eq!(id, "5f1e");
    }

    #[tokio::test]
    async fn unreadable_create_response_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_datapoint("alice", "work", "secret", 1.0, 1, "")
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transient);
    }

    #[tokio::test]
    async fn delete_of_missing_datapoint_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/users/alice/goals/work/datapoints/abc.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"errors\":\"not found\"}"))
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_datapoint("alice", "work", "secret", "abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
        assert!(err.message.contains("404"));
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        let config = BeeminderConfig {
            base_url: "http://127.0.0.1:1".into(),
            request_timeout_secs: 5,
        };
        let err = BeeminderClient::new(&config)
            .unwrap()
            .check_goal("alice", "work", "secret")
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transient);
    }
}
