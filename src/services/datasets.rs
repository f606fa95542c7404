//! 数据集服务
//!
//! 负责把上传内容、对象存储中的对象、数据库查询结果加载为 `Frame`，
//! 并以内容摘要去重缓存，交互时无需重复解析。

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{self, TableSource};
use crate::error::AppError;
use crate::frame::{parse_csv, ColumnKind, Frame, FrameError};
use crate::storage::{validate_key, ObjectInfo, ObjectStore};

/// 数据集来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSource {
    Upload,
    Object { key: String },
    Database { source: String },
}

/// 已加载的数据集
#[derive(Debug)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub source: DatasetSource,
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
    pub frame: Frame,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub non_missing: usize,
}

/// 数据集摘要（列表、详情接口使用）
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub id: Uuid,
    pub name: String,
    pub source: DatasetSource,
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

impl Dataset {
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            id: self.id,
            name: self.name.clone(),
            source: self.source.clone(),
            digest: self.digest.clone(),
            loaded_at: self.loaded_at,
            rows: self.frame.len(),
            columns: self
                .frame
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    kind: c.kind(),
                    non_missing: c.non_missing(),
                })
                .collect(),
        }
    }
}

/// 内存数据集缓存
///
/// 以 id 索引，同时按内容摘要去重；超过容量时淘汰最早加载的数据集。
pub struct DatasetStore {
    datasets: DashMap<Uuid, Arc<Dataset>>,
    by_digest: DashMap<String, Uuid>,
    capacity: usize,
}

impl DatasetStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            datasets: DashMap::new(),
            by_digest: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// 插入数据集，返回 (数据集, 是否命中缓存)
    ///
    /// 摘要索引项在整个插入过程中保持锁定，相同内容并发插入时只保留一份。
    pub fn insert(
        &self,
        name: String,
        source: DatasetSource,
        digest: String,
        frame: Frame,
    ) -> (Arc<Dataset>, bool) {
        let (dataset, cached) = match self.by_digest.entry(digest.clone()) {
            Entry::Occupied(mut entry) => match self.get(*entry.get()) {
                Some(existing) => (existing, true),
                None => {
                    let dataset = self.store_new(name, source, digest, frame);
                    entry.insert(dataset.id);
                    (dataset, false)
                }
            },
            Entry::Vacant(entry) => {
                let dataset = self.store_new(name, source, digest, frame);
                entry.insert(dataset.id);
                (dataset, false)
            }
        };

        // 淘汰会回写摘要索引，必须在释放索引项之后进行
        if !cached {
            self.evict_over_capacity();
        }
        (dataset, cached)
    }

    fn store_new(
        &self,
        name: String,
        source: DatasetSource,
        digest: String,
        frame: Frame,
    ) -> Arc<Dataset> {
        let dataset = Arc::new(Dataset {
            id: Uuid::new_v4(),
            name,
            source,
            digest,
            loaded_at: Utc::now(),
            frame,
        });
        self.datasets.insert(dataset.id, dataset.clone());
        dataset
    }

    /// 解析 CSV 内容并插入；内容已缓存时跳过解析
    pub fn load_csv(
        &self,
        name: &str,
        bytes: &[u8],
        source: DatasetSource,
    ) -> Result<(Arc<Dataset>, bool), FrameError> {
        let digest = content_digest(bytes);
        if let Some(dataset) = self.find_by_digest(&digest) {
            return Ok((dataset, true));
        }

        let frame = parse_csv(bytes)?;
        Ok(self.insert(name.to_string(), source, digest, frame))
    }

    fn find_by_digest(&self, digest: &str) -> Option<Arc<Dataset>> {
        let id = *self.by_digest.get(digest)?;
        self.get(id)
    }

    fn evict_over_capacity(&self) {
        while self.datasets.len() > self.capacity {
            let oldest = self
                .datasets
                .iter()
                .min_by_key(|entry| entry.value().loaded_at)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    tracing::debug!(dataset_id = %id, "Evicting dataset from cache");
                    self.remove(id);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Dataset>> {
        self.datasets.get(&id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<Dataset>> {
        let (_, dataset) = self.datasets.remove(&id)?;
        self.by_digest.remove_if(&dataset.digest, |_, owner| *owner == id);
        Some(dataset)
    }

    /// 按加载时间倒序
    pub fn list(&self) -> Vec<Arc<Dataset>> {
        let mut all: Vec<Arc<Dataset>> = self.datasets.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.loaded_at.cmp(&a.loaded_at));
        all
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// 内容摘要
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn frame_digest(source: &str, frame: &Frame) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    for column in frame.columns() {
        hasher.update(column.name.as_bytes());
        hasher.update([0u8]);
        for row in 0..column.len() {
            hasher.update(column.display(row).as_bytes());
            hasher.update([0x1f]);
        }
    }
    hex::encode(hasher.finalize())
}

/// 加载结果
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Arc<Dataset>,
    pub cached: bool,
}

pub struct DatasetService {
    store: Arc<DatasetStore>,
    objects: Arc<dyn ObjectStore>,
    db: Option<PgPool>,
}

impl DatasetService {
    pub fn new(store: Arc<DatasetStore>, objects: Arc<dyn ObjectStore>, db: Option<PgPool>) -> Self {
        Self { store, objects, db }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// 解析 CSV 内容并缓存
    pub fn ingest_csv(
        &self,
        name: &str,
        bytes: &[u8],
        source: DatasetSource,
    ) -> Result<LoadOutcome, AppError> {
        let (dataset, cached) = self.store.load_csv(name, bytes, source)?;
        self.record_load(&dataset, cached);
        Ok(LoadOutcome { dataset, cached })
    }

    /// 在阻塞线程池上计算摘要并解析，避免大文件占用异步工作线程
    pub async fn ingest_csv_blocking<B>(
        &self,
        name: String,
        bytes: B,
        source: DatasetSource,
    ) -> Result<LoadOutcome, AppError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let store = self.store.clone();
        let (dataset, cached) = tokio::task::spawn_blocking(move || {
            store.load_csv(&name, bytes.as_ref(), source)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "CSV ingest task failed");
            AppError::Internal
        })??;

        self.record_load(&dataset, cached);
        Ok(LoadOutcome { dataset, cached })
    }

    /// 从对象存储加载 CSV
    pub async fn import_object(&self, key: &str) -> Result<LoadOutcome, AppError> {
        validate_key(key)?;
        let key = key.trim();
        let bytes = self.objects.get(key).await?;

        let name = key.rsplit('/').next().unwrap_or(key).to_string();
        self.ingest_csv_blocking(name, bytes, DatasetSource::Object { key: key.to_string() })
            .await
    }

    /// 从数据库加载表或配置的查询
    pub async fn import_table(
        &self,
        source: TableSource,
        max_rows: usize,
    ) -> Result<LoadOutcome, AppError> {
        let pool = self.db.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Database is not configured".to_string())
        })?;

        let frame = db::fetch_frame(pool, &source, max_rows).await?;
        let label = source.describe();
        let digest = frame_digest(&label, &frame);
        let (dataset, cached) = self.store.insert(
            label.clone(),
            DatasetSource::Database { source: label },
            digest,
            frame,
        );
        self.record_load(&dataset, cached);
        Ok(LoadOutcome { dataset, cached })
    }

    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, AppError> {
        Ok(self.objects.list(prefix).await?)
    }

    fn record_load(&self, dataset: &Dataset, cached: bool) {
        if cached {
            metrics::counter!("datasets_cache_hits_total").increment(1);
            tracing::info!(dataset_id = %dataset.id, name = %dataset.name, "Dataset served from cache");
            return;
        }
        metrics::counter!("datasets_loaded_total").increment(1);
        metrics::gauge!("datasets_cached").set(self.store.len() as f64);
        tracing::info!(
            dataset_id = %dataset.id,
            name = %dataset.name,
            rows = dataset.frame.len(),
            columns = dataset.frame.width(),
            "Dataset loaded"
        );
    }
}
