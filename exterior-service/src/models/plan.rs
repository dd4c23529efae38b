use serde::Deserialize;

/// Body of `POST /get-plan`. A missing prompt is tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub prompt: String,
}
