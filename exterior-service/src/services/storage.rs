use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use service_core::error::AppError;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::config::StorageConfig;

/// Blob store for uploaded photos. `put` returns a URL the inference service
/// can fetch the object from.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, region: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            bucket,
            region,
            endpoint,
        }
    }

    /// Builds the SDK client from the storage section. Static credentials are
    /// used when both halves are set; otherwise the default provider chain.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()));

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "exterior-service",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(
            S3Client::from_conf(builder.build()),
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )
    }

    /// Public URL of `key`, with each path segment percent-encoded.
    pub fn object_url(&self, key: &str) -> String {
        let encoded_key = encode_key(key);

        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                encoded_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, encoded_key
            ),
        }
    }
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(anyhow::anyhow!(
                    "S3 upload failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(self.object_url(key))
    }
}

/// Writes objects under a local directory that is served elsewhere at
/// `public_base_url`. Intended for development.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into(),
        })
    }

    /// File backing `key`. Keys that would resolve outside `base_path`
    /// (parent, root or prefix components) are refused.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes || key.is_empty() {
            return Err(AppError::StorageError(anyhow::anyhow!(
                "Refusing to store key outside the storage directory: {}",
                key
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        let path = self.path_for(key)?;
        let write = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, data).await
        };
        write.await.map_err(|e| {
            AppError::StorageError(anyhow::anyhow!(
                "Failed to write {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            encode_key(key)
        ))
    }
}

/// In-memory store for tests. Keeps every object it accepts.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<Vec<StoredObject>>,
    fail: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub data: Vec<u8>,
    pub content_type: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `put` fails.
    pub fn failing() -> Self {
        Self {
            objects: Mutex::default(),
            fail: true,
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::StorageError(anyhow::anyhow!(
                "memory storage configured to fail"
            )));
        }

        self.objects
            .lock()
            .map_err(|_| AppError::StorageError(anyhow::anyhow!("memory storage poisoned")))?
            .push(StoredObject {
                key: key.to_string(),
                data,
                content_type: content_type.to_string(),
            });

        Ok(format!("memory://{}", key))
    }
}
