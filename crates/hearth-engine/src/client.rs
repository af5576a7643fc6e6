// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the engine API.
//!
//! [`EngineClient`] is the single place that talks to the engine over HTTP.
//! It only sets a connect timeout: generations may run for minutes and are
//! bounded by cancellation instead. Connection failures get exactly one
//! reconnect attempt before surfacing as [`HearthError::EngineUnavailable`].

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use hearth_core::{
    ChunkStream, GenerationBackend, GenerationRequest, GenerationResponse, HearthError,
    StreamChunk,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use url::{Host, Url};

use crate::ndjson;
use crate::types::{ChatLine, ChatRequest, ErrorBody, VersionResponse};

/// Delay before the single reconnect attempt.
const RECONNECT_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    reconnect_delay: Duration,
}

impl EngineClient {
    /// Client for the engine at `base_url` (e.g. `http://127.0.0.1:11434`).
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, HearthError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HearthError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reconnect_delay: RECONNECT_DELAY,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// One health check bounded by `timeout`. Never retries.
    pub async fn is_healthy(&self, timeout: Duration) -> bool {
        match self
            .http
            .get(self.url("/api/version"))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }

    /// The engine's reported version string.
    pub async fn version(&self) -> Result<String, HearthError> {
        let response = self
            .send(|http| http.get(self.url("/api/version")))
            .await?;
        let response = ensure_success(response).await?;
        let body: VersionResponse = response.json().await.map_err(|e| HearthError::Engine {
            message: format!("failed to parse version response: {e}"),
        })?;
        Ok(body.version)
    }

    /// Send a request, reconnecting once if the connection could not be made.
    pub(crate) async fn send<F>(&self, build: F) -> Result<Response, HearthError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        match build(&self.http).send().await {
            Ok(resp) => Ok(resp),
            Err(e) if e.is_connect() => {
                warn!(error = %e, "engine connection failed, reconnecting once");
                tokio::time::sleep(self.reconnect_delay).await;
                build(&self.http).send().await.map_err(transport_error)
            }
            Err(e) => Err(transport_error(e)),
        }
    }
}

/// The `host:port` a managed engine must listen on to be reached at `base_url`.
///
/// Only plain-HTTP loopback addresses qualify: the engine never leaves this
/// machine. `localhost` binds as `127.0.0.1`.
pub fn loopback_bind_address(base_url: &str) -> Result<String, HearthError> {
    let url = Url::parse(base_url)
        .map_err(|e| HearthError::Validation(format!("invalid engine URL `{base_url}`: {e}")))?;
    if url.scheme() != "http" {
        return Err(HearthError::Validation(format!(
            "engine URL `{base_url}` must use http"
        )));
    }
    let host = match url.host() {
        Some(Host::Domain(name)) if name.eq_ignore_ascii_case("localhost") => {
            "127.0.0.1".to_string()
        }
        Some(Host::Ipv4(ip)) if ip.is_loopback() => ip.to_string(),
        Some(Host::Ipv6(ip)) if ip.is_loopback() => format!("[{ip}]"),
        _ => {
            return Err(HearthError::Validation(format!(
                "engine URL `{base_url}` must point at this machine (127.0.0.1, ::1 or localhost)"
            )));
        }
    };
    let port = url.port().ok_or_else(|| {
        HearthError::Validation(format!("engine URL `{base_url}` needs an explicit port"))
    })?;
    if url.path() != "/" || url.query().is_some() {
        return Err(HearthError::Validation(format!(
            "engine URL `{base_url}` must not carry a path"
        )));
    }
    Ok(format!("{host}:{port}"))
}

/// Map a transport failure to [`HearthError::EngineUnavailable`].
pub(crate) fn transport_error(e: reqwest::Error) -> HearthError {
    let message = if e.is_timeout() {
        "engine request timed out".to_string()
    } else if e.is_connect() {
        "could not connect to engine".to_string()
    } else {
        format!("engine request failed: {e}")
    };
    HearthError::unavailable(message, Some(Box::new(e)))
}

/// Pass a success response through, turning anything else into [`HearthError::Engine`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response, HearthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(HearthError::Engine {
        message: error_message(status, response).await,
    })
}

/// Best-effort error text from an engine error response.
pub(crate) async fn error_message(status: StatusCode, response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => format!("engine returned {status}: {}", parsed.error),
        Err(_) if body.is_empty() => format!("engine returned {status}"),
        Err(_) => format!("engine returned {status}: {body}"),
    }
}

fn chunk_from_line(line: ChatLine) -> Result<StreamChunk, HearthError> {
    if let Some(error) = line.error {
        return Err(HearthError::Engine { message: error });
    }
    Ok(StreamChunk {
        content: line.message.map(|m| m.content).unwrap_or_default(),
        done: line.done,
    })
}

#[async_trait]
impl GenerationBackend for EngineClient {
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, HearthError> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
        };
        let response = self
            .send(|http| http.post(self.url("/api/chat")).json(&body))
            .await?;
        let response = ensure_success(response).await?;
        let line: ChatLine = response.json().await.map_err(|e| HearthError::Engine {
            message: format!("failed to parse chat response: {e}"),
        })?;
        let model = line.model.clone().unwrap_or_else(|| request.model.clone());
        let chunk = chunk_from_line(line)?;
        Ok(GenerationResponse {
            model,
            content: chunk.content,
        })
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream, HearthError> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };
        let response = self
            .send(|http| http.post(self.url("/api/chat")).json(&body))
            .await?;
        let response = ensure_success(response).await?;
        debug!(model = %request.model, "chat stream opened");

        let chunks = ndjson::decode_response::<ChatLine>(response)
            .map(|line| line.and_then(chunk_from_line));
        Ok(Box::pin(chunks))
    }
}
