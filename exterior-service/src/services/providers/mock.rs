//! Mock provider implementations for testing.

use super::{FloorPlanProvider, ImageToImageProvider, ProviderError};
use crate::models::ControlNetInput;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// Returns a canned output, or fails, and records every input it sees.
pub struct MockImageToImageProvider {
    output: Option<Value>,
    calls: Mutex<Vec<ControlNetInput>>,
}

impl MockImageToImageProvider {
    pub fn new(output: Value) -> Self {
        Self {
            output: Some(output),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<ControlNetInput> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageToImageProvider for MockImageToImageProvider {
    async fn run(&self, input: &ControlNetInput) -> Result<Value, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(input.clone());
        }

        self.output.clone().ok_or_else(|| ProviderError::PredictionFailed {
            id: "mock".to_string(),
            status: "failed".to_string(),
            detail: "mock provider configured to fail".to_string(),
        })
    }
}

/// Echoes the prompt back inside a canned payload.
pub struct MockFloorPlanProvider {
    enabled: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockFloorPlanProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FloorPlanProvider for MockFloorPlanProvider {
    async fn predict(&self, prompt: &str) -> Result<Value, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock floor plan provider not enabled".to_string(),
            ));
        }

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        Ok(serde_json::json!([{ "plan": format!("Mock floor plan for: {}", prompt) }]))
    }
}
