//! Authoritative REST source.
//!
//! Seed fetches, write persistence, and fallback polling all go through
//! [`RemoteSource`]. [`ApiClient`] is the production implementation;
//! tests substitute their own.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tether_core::ChatEntry;

/// A subscription plan as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Monthly price in the backend's smallest currency unit
    #[serde(default)]
    pub price: Option<u64>,
    /// Whether this plan is the team's active plan
    #[serde(default)]
    pub is_current_plan: bool,
}

/// Payload for persisting newly sent entries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatLogRequest<'a> {
    client_id: &'a str,
    new_user_log: &'a [ChatEntry],
}

/// Read and write access to the authoritative backend.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Full chat history for a client. Used to seed the store on
    /// session start.
    async fn chat_history(&self, client_id: &str) -> Result<Vec<ChatEntry>>;

    /// Persist entries the user just sent.
    async fn persist_entries(&self, client_id: &str, entries: &[ChatEntry]) -> Result<()>;

    /// Current plans for a team. Used by fallback polling.
    async fn plans(&self, team_id: &str) -> Result<Vec<Plan>>;
}

/// [`RemoteSource`] over HTTP.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    /// Send a bearer token with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.post(url))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn chat_history(&self, client_id: &str) -> Result<Vec<ChatEntry>> {
        let url = format!("{}/support-logs/{client_id}", self.base_url);
        let history = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(history)
    }

    async fn persist_entries(&self, client_id: &str, entries: &[ChatEntry]) -> Result<()> {
        let url = format!("{}/chat-log", self.base_url);
        self.post(&url)
            .json(&ChatLogRequest {
                client_id,
                new_user_log: entries,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn plans(&self, team_id: &str) -> Result<Vec<Plan>> {
        let url = format!("{}/plans/{team_id}", self.base_url);
        let plans = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(plans)
    }
}
