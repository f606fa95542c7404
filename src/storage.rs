//! 对象存储适配
//!
//! 提供统一的对象读取接口，支持两种后端：
//! - 本地文件系统（开发、挂载卷）
//! - S3 兼容存储 (AWS S3, MinIO)

use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::Region;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{LocalStorageConfig, S3StorageConfig, StorageConfig, StorageType};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 对象列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// 对象存储接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 读取整个对象
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// 列出前缀下的 CSV 对象，按 key 排序
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// 检查存储是否可用
    async fn health_check(&self) -> bool;

    fn kind(&self) -> StorageType;
}

/// 根据配置创建存储后端
pub fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.storage_type {
        StorageType::Local => Ok(Arc::new(LocalObjectStore::new(&config.local))),
        StorageType::S3 => Ok(Arc::new(S3ObjectStore::new(&config.s3)?)),
    }
}

fn is_csv(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with(".csv")
}

/// 校验对象 key：非空、相对路径、不含 `..`
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let trimmed = key.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') || trimmed.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let escapes = Path::new(trimmed)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ==================== 本地文件系统 ====================

pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(config: &LocalStorageConfig) -> Self {
        Self {
            base_path: PathBuf::from(&config.base_path),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(key.trim()))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        debug!(path = %path.display(), "Reading local object");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.base_path) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if is_csv(&key) && key.starts_with(prefix) {
                    objects.push(ObjectInfo {
                        key,
                        size: metadata.len(),
                    });
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn health_check(&self) -> bool {
        tokio::fs::metadata(&self.base_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn kind(&self) -> StorageType {
        StorageType::Local
    }
}

// ==================== S3 ====================

pub struct S3ObjectStore {
    bucket: Bucket,
}

impl S3ObjectStore {
    pub fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        let access_key = config
            .access_key
            .as_ref()
            .map(|k| k.expose_secret().clone())
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok());
        let secret_key = config
            .secret_key
            .as_ref()
            .map(|k| k.expose_secret().clone())
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok());

        let credentials = match (access_key, secret_key) {
            (Some(access), Some(secret)) => {
                Credentials::new(Some(&access), Some(&secret), None, None, None)
            }
            _ => {
                warn!("S3 credentials not configured, using anonymous access");
                Credentials::anonymous()
            }
        }
        .map_err(|e| StorageError::Backend(format!("Failed to construct S3 credentials: {}", e)))?;

        let region_str = config
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string());

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: region_str,
                endpoint: endpoint.clone(),
            },
            None => region_str.parse().unwrap_or(Region::UsEast1),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(format!("Failed to create S3 bucket client: {}", e)))?;

        Ok(Self { bucket })
    }
}

fn map_s3_error(key: &str, error: S3Error) -> StorageError {
    match error {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let key = key.trim();
        debug!(bucket = %self.bucket.name, key = %key, "Downloading S3 object");

        let response = self
            .bucket
            .get_object(format!("/{}", key))
            .await
            .map_err(|e| map_s3_error(key, e))?;

        Ok(response.bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| map_s3_error(prefix, e))?;

        let mut objects: Vec<ObjectInfo> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .filter(|object| is_csv(&object.key))
            .map(|object| ObjectInfo {
                key: object.key,
                size: object.size,
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn health_check(&self) -> bool {
        match self.bucket.location().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "S3 health check failed");
                false
            }
        }
    }

    fn kind(&self) -> StorageType {
        StorageType::S3
    }
}
