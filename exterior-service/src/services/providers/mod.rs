//! Hosted model providers.
//!
//! Each hosted model sits behind a trait so handlers hold an
//! `Arc<dyn …>` built once at startup, and tests can swap in the mocks.

pub mod gradio;
pub mod mock;
pub mod replicate;

use async_trait::async_trait;
use serde_json::Value;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::ControlNetInput;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Prediction {id} ended with status {status}: {detail}")]
    PredictionFailed {
        id: String,
        status: String,
        detail: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::InferenceError(anyhow::Error::new(err))
    }
}

/// Image-conditioned generation (photo + prompt in, rendered output out).
#[async_trait]
pub trait ImageToImageProvider: Send + Sync {
    /// Runs the model to completion and returns its output untouched.
    async fn run(&self, input: &ControlNetInput) -> Result<Value, ProviderError>;
}

/// Floor-plan generation from a text prompt.
#[async_trait]
pub trait FloorPlanProvider: Send + Sync {
    async fn predict(&self, prompt: &str) -> Result<Value, ProviderError>;
}
