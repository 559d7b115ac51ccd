// 上游客户端实现
// 基于 reqwest 连接池封装

use reqwest::{header, Client, RequestBuilder, Response};
use thiserror::Error;
use tokio::time::Duration;

use crate::error::AppResult;
use crate::proxy::mappers::openai::{build_probe_request, UpstreamChatRequest};

/// Failure of a real forwarded call. Statuses below 500 are not errors; their
/// bodies go back to the client as-is.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("upstream body unreadable: {0}")]
    InvalidBody(String),
}

impl UpstreamError {
    /// Status carried to the client; 500 when upstream gave none
    pub fn status_code(&self) -> u16 {
        match self {
            UpstreamError::Transport(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
            UpstreamError::Status { status, .. } => *status,
            UpstreamError::InvalidBody(_) => 500,
        }
    }
}

/// Why a capability probe did not accept the model. Feeds the fallback decision only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,

    #[error("probe rejected with status {0}")]
    Rejected(u16),

    #[error("probe transport error: {0}")]
    Transport(String),
}

pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(request_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            // Connection settings (连接复用，减少建立开销)
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(request_timeout)
            .user_agent(crate::constants::USER_AGENT.as_str())
            .build()?;

        Ok(Self { client })
    }

    fn post(&self, url: &str, api_key: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// Forward a chat request. `Ok` for any status below 500.
    pub async fn post_chat(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &UpstreamChatRequest,
    ) -> Result<Response, UpstreamError> {
        let response = self.post(url, api_key).json(body).send().await?;

        let status = response.status();
        if status.is_server_error() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            tracing::warn!("Upstream {} returned {}: {}", url, status, message);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// One-token completion with `model` verbatim; success only on 2xx
    pub async fn probe(
        &self,
        url: &str,
        api_key: Option<&str>,
        model: String,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let body = build_probe_request(model);
        let response = self
            .post(url, api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout
                } else {
                    ProbeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Rejected(status.as_u16()))
        }
    }
}
