//! Gradio space client for the floor-plan model.
//!
//! Uses the Gradio `/call` REST protocol: a POST queues the job and returns an
//! event id, then a GET on the same path streams server-sent events until a
//! `complete` (or `error`) event arrives.

use super::{FloorPlanProvider, ProviderError};
use crate::config::FloorPlanConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use service_core::observability::TracedClientExt;
use tokio::sync::OnceCell;

pub struct GradioFloorPlanProvider {
    client: Client,
    space: String,
    endpoint: String,
    hf_api_base: String,
    hf_token: Option<String>,
    host: OnceCell<String>,
}

impl GradioFloorPlanProvider {
    pub fn new(config: &FloorPlanConfig) -> Self {
        Self {
            client: Client::new(),
            space: config.space.clone(),
            endpoint: config.endpoint.trim_matches('/').to_string(),
            hf_api_base: config.hf_api_base.trim_end_matches('/').to_string(),
            hf_token: config.hf_token.clone(),
            host: OnceCell::new_with(
                config
                    .host
                    .as_deref()
                    .map(|h| h.trim_end_matches('/').to_string()),
            ),
        }
    }

    /// Resolves the space's host on first use and reuses it afterwards.
    async fn connect(&self) -> Result<&str, ProviderError> {
        self.host
            .get_or_try_init(|| self.resolve_host())
            .await
            .map(String::as_str)
    }

    async fn resolve_host(&self) -> Result<String, ProviderError> {
        if self.space.starts_with("http://") || self.space.starts_with("https://") {
            return Ok(self.space.trim_end_matches('/').to_string());
        }

        let url = format!("{}/api/spaces/{}/host", self.hf_api_base, self.space);
        let response = self
            .client
            .traced_get(&url)
            .optional_bearer_auth(self.hf_token.as_deref())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Could not resolve space {} ({}): {}",
                self.space, status, error_text
            )));
        }

        let SpaceHost { host } = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad space host reply: {}", e)))?;

        tracing::info!(space = %self.space, host = %host, "Connected to Gradio space");
        Ok(host.trim_end_matches('/').to_string())
    }
}

#[async_trait]
impl FloorPlanProvider for GradioFloorPlanProvider {
    async fn predict(&self, prompt: &str) -> Result<Value, ProviderError> {
        let host = self.connect().await?;
        let call_url = format!("{}/call/{}", host, self.endpoint);

        let response = self
            .client
            .traced_post(&call_url)
            .optional_bearer_auth(self.hf_token.as_deref())
            .json(&json!({ "data": [prompt] }))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Gradio call error {}: {}",
                status, error_text
            )));
        }

        let QueuedCall { event_id } = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Missing event id: {}", e)))?;

        tracing::debug!(space = %self.space, event_id = %event_id, "Gradio call queued");

        let response = self
            .client
            .traced_get(&format!("{}/{}", call_url, event_id))
            .optional_bearer_auth(self.hf_token.as_deref())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "Gradio result stream error {}",
                response.status()
            )));
        }

        let mut decoder = SseDecoder::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::NetworkError(e.to_string()))?;
            for event in decoder.push(&chunk) {
                if let Some(result) = event.into_result()? {
                    return Ok(result);
                }
            }
        }

        Err(ProviderError::InvalidResponse(
            "Gradio stream ended without a complete event".to_string(),
        ))
    }
}

#[derive(Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Deserialize)]
struct QueuedCall {
    event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SseEvent {
    event: String,
    data: String,
}

impl SseEvent {
    /// `Some` once the call is finished, `None` for progress and heartbeats.
    fn into_result(self) -> Result<Option<Value>, ProviderError> {
        match self.event.as_str() {
            "complete" => serde_json::from_str(&self.data).map(Some).map_err(|e| {
                ProviderError::InvalidResponse(format!("Bad complete payload: {}", e))
            }),
            "error" => Err(ProviderError::ApiError(format!(
                "Gradio prediction failed: {}",
                self.data
            ))),
            _ => Ok(None),
        }
    }
}

/// Incremental server-sent-events splitter. Carriage returns are dropped so
/// `\r\n` framed streams split the same way.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data.is_empty() && event == "message" {
        return None;
    }

    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}
