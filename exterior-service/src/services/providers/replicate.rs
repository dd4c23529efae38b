//! Replicate predictions API client.
//!
//! Creates a prediction for a pinned model version and polls it until it
//! reaches a terminal status. There is no overall deadline: a slow model
//! keeps the request open.

use super::{ImageToImageProvider, ProviderError};
use crate::config::ReplicateConfig;
use crate::models::ControlNetInput;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::observability::TracedClientExt;
use std::time::Duration;

/// ControlNet conditioned on Hough line detection (M-LSD).
pub const CONTROLNET_HOUGH_MODEL: &str =
    "jagilley/controlnet-hough:854e8727697a057c525cdb45ab037f64ecca770a1769cc52287c2e56472a247b";

pub struct ReplicateProvider {
    client: Client,
    api_base: String,
    api_token: String,
    model: String,
    version: String,
    poll_interval: Duration,
}

impl ReplicateProvider {
    pub fn new(config: &ReplicateConfig) -> Result<Self, ProviderError> {
        if config.api_token.is_empty() {
            return Err(ProviderError::NotConfigured(
                "REPLICATE_API_TOKEN is empty".to_string(),
            ));
        }

        let (_, version) = config
            .model
            .split_once(':')
            .filter(|(name, version)| name.contains('/') && !version.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "model {:?} must look like owner/name:version",
                    config.model
                ))
            })?;

        Ok(Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            version: version.to_string(),
            poll_interval: config.poll_interval(),
        })
    }

    async fn create_prediction<I: Serialize + Sync>(
        &self,
        input: &I,
    ) -> Result<Prediction, ProviderError> {
        let url = format!("{}/v1/predictions", self.api_base);
        let response = self
            .client
            .traced_post(&url)
            .bearer_auth(&self.api_token)
            .json(&CreatePrediction {
                version: &self.version,
                input,
            })
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        parse_prediction(response).await
    }

    async fn get_prediction(&self, prediction: &Prediction) -> Result<Prediction, ProviderError> {
        let url = prediction
            .urls
            .as_ref()
            .and_then(|urls| urls.get.clone())
            .unwrap_or_else(|| format!("{}/v1/predictions/{}", self.api_base, prediction.id));

        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        parse_prediction(response).await
    }
}

async fn parse_prediction(response: reqwest::Response) -> Result<Prediction, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError(format!(
            "Replicate API error {}: {}",
            status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse prediction: {}", e)))
}

#[async_trait]
impl ImageToImageProvider for ReplicateProvider {
    async fn run(&self, input: &ControlNetInput) -> Result<Value, ProviderError> {
        tracing::debug!(
            model = %self.model,
            prompt_len = input.prompt.len(),
            "Creating Replicate prediction"
        );

        let mut prediction = self.create_prediction(input).await?;
        tracing::info!(prediction_id = %prediction.id, status = %prediction.status, "Prediction created");

        loop {
            let status = prediction.status.clone();
            match status.as_str() {
                "succeeded" => {
                    tracing::info!(prediction_id = %prediction.id, "Prediction succeeded");
                    return Ok(prediction.output.unwrap_or(Value::Null));
                }
                "failed" | "canceled" => {
                    return Err(ProviderError::PredictionFailed {
                        detail: prediction
                            .error
                            .map(|e| match e {
                                Value::String(s) => s,
                                other => other.to_string(),
                            })
                            .unwrap_or_default(),
                        id: prediction.id,
                        status,
                    });
                }
                _ => {
                    tokio::time::sleep(self.poll_interval).await;
                    prediction = self.get_prediction(&prediction).await?;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct CreatePrediction<'a, I> {
    version: &'a str,
    input: &'a I,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}
