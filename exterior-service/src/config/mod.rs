use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::services::providers::replicate::CONTROLNET_HOUGH_MODEL;

/// Default Gradio space serving the floor-plan model.
pub const DEFAULT_FLOOR_PLAN_SPACE: &str = "mrblackk/floor-plan-generation";
pub const DEFAULT_FLOOR_PLAN_ENDPOINT: &str = "/predict";

#[derive(Debug, Clone, Deserialize)]
pub struct ExteriorConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub storage: StorageConfig,
    pub replicate: ReplicateConfig,
    pub floor_plan: FloorPlanConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub local_path: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub api_base: String,
    /// `owner/name:version`
    pub model: String,
    pub poll_interval_ms: u64,
}

impl ReplicateConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorPlanConfig {
    pub space: String,
    pub endpoint: String,
    /// Skips the Hugging Face host lookup when set.
    pub host: Option<String>,
    pub hf_api_base: String,
    pub hf_token: Option<String>,
}

impl ExteriorConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ExteriorConfig {
            common: common_config,
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("local"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                s3_bucket: get_env("S3_BUCKET_NAME", Some("exterior-uploads"), is_prod)?,
                s3_region: get_env("AWS_REGION", Some("us-east-1"), is_prod)?,
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), false)?,
                public_base_url: get_env(
                    "STORAGE_PUBLIC_BASE_URL",
                    Some("http://localhost:3000/uploads"),
                    false,
                )?,
            },
            replicate: ReplicateConfig {
                api_token: get_env("REPLICATE_API_TOKEN", None, is_prod)?,
                api_base: get_env("REPLICATE_API_BASE", Some("https://api.replicate.com"), false)?,
                model: get_env("REPLICATE_MODEL", Some(CONTROLNET_HOUGH_MODEL), false)?,
                poll_interval_ms: get_env("REPLICATE_POLL_INTERVAL_MS", Some("500"), false)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "REPLICATE_POLL_INTERVAL_MS is not a number: {}",
                            e
                        ))
                    })?,
            },
            floor_plan: FloorPlanConfig {
                space: get_env("FLOOR_PLAN_SPACE", Some(DEFAULT_FLOOR_PLAN_SPACE), false)?,
                endpoint: get_env("FLOOR_PLAN_ENDPOINT", Some(DEFAULT_FLOOR_PLAN_ENDPOINT), false)?,
                host: env::var("FLOOR_PLAN_HOST").ok(),
                hf_api_base: get_env("HF_API_BASE", Some("https://huggingface.co"), false)?,
                hf_token: env::var("HF_TOKEN").ok(),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
