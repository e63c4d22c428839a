//! Reqwest binding to the venue API
//!
//! Sessions ride on cookies; the server signals an expired session with
//! HTTP 403, which maps to [`Error::ReauthRequired`] so the gate can
//! recover it. Everything else non-2xx maps to [`Error::Rejected`] and
//! passes through the gate untouched.

use async_trait::async_trait;
use greenroom_core::{AuthApi, EntityId, Error, EventDraft, EventRecord, ResourceApi, Result};
use std::time::Duration;
use tracing::debug;

/// Route table for the venue API
pub mod routes {
    use greenroom_core::EntityId;

    /// Event collection (GET list, POST create, DELETE clear)
    pub const EVENTS: &str = "/api/events";
    /// Session renewal
    pub const AUTH_REFRESH: &str = "/api/auth/refresh";
    /// Credential login
    pub const AUTH_LOGIN: &str = "/api/auth/login";

    /// Single-event route (PUT update, DELETE remove)
    pub fn event(id: EntityId) -> String {
        format!("{}/{}", EVENTS, id)
    }
}

/// Connection settings for [`RestClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the venue API, without trailing slash
    pub base_url: String,
    /// Per-request transport timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Build a config, taking the base URL from `GREENROOM_API_URL` when
    /// set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("GREENROOM_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        config
    }
}

/// Map a non-success HTTP status to the error taxonomy
///
/// 403 is the server's expired-session signal (matching the venue API
/// contract); everything else is a plain rejection.
fn rejection(status: u16, message: String) -> Error {
    if status == 403 {
        Error::ReauthRequired
    } else {
        Error::Rejected { status, message }
    }
}

/// Cookie-carrying HTTP client for the venue API
pub struct RestClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RestClient {
    /// Build a client from the given config
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::network)?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and surface non-success statuses as errors
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(Error::network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(target: "greenroom::rest", status = status.as_u16(), "request rejected");
        Err(rejection(status.as_u16(), body))
    }

    /// Authenticate with credentials; the session cookie is stored on the
    /// client. Not routed through the gate: a login failure is for the
    /// login form, not the refresh machinery.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = serde_json::json!({ "username": username, "password": password });
        self.send(self.http.post(self.url(routes::AUTH_LOGIN)).json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceApi for RestClient {
    async fn create(&self, draft: &EventDraft) -> Result<EventRecord> {
        let response = self
            .send(self.http.post(self.url(routes::EVENTS)).json(draft))
            .await?;
        response.json().await.map_err(Error::network)
    }

    async fn update(&self, id: EntityId, draft: &EventDraft) -> Result<()> {
        self.send(self.http.put(self.url(&routes::event(id))).json(draft))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        self.send(self.http.delete(self.url(&routes::event(id))))
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.send(self.http.delete(self.url(routes::EVENTS))).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EventRecord>> {
        let response = self.send(self.http.get(self.url(routes::EVENTS))).await?;
        response.json().await.map_err(Error::network)
    }
}

#[async_trait]
impl AuthApi for RestClient {
    async fn refresh(&self) -> Result<()> {
        self.send(self.http.post(self.url(routes::AUTH_REFRESH)))
            .await?;
        Ok(())
    }
}
