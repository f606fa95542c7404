//! 数据集管理的 HTTP 处理器：上传、导入、列表、详情、删除

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::TableSource,
    error::AppError,
    middleware::AppState,
    services::{DatasetSource, LoadOutcome},
};

/// 浏览器上传 CSV 时可能使用的内容类型
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "text/plain",
    "application/octet-stream",
    "application/vnd.ms-excel",
];

const DEFAULT_UPLOAD_NAME: &str = "upload.csv";

#[derive(Debug, Deserialize, Validate)]
pub struct UploadQuery {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportObjectRequest {
    #[validate(length(min = 1, max = 1024))]
    pub key: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportDatabaseRequest {
    #[validate(length(min = 1, max = 128))]
    pub table: Option<String>,
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListObjectsQuery {
    #[serde(default)]
    pub prefix: String,
}

fn load_response(outcome: LoadOutcome) -> impl IntoResponse {
    let status = if outcome.cached {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (
        status,
        Json(json!({
            "cached": outcome.cached,
            "dataset": outcome.dataset.info(),
        })),
    )
}

fn check_content_type(headers: &HeaderMap) -> Result<(), AppError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = value
        .to_str()
        .map_err(|_| AppError::UnsupportedMediaType("Invalid Content-Type header".to_string()))?;
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    if ACCEPTED_CONTENT_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMediaType(format!(
            "Expected a CSV body, got {}",
            mime
        )))
    }
}

/// 上传 CSV（请求体为文件原始内容）
pub async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    check_content_type(&headers)?;

    let name = query.name.unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    if !name.to_ascii_lowercase().ends_with(".csv") {
        return Err(AppError::BadRequest("Only .csv files are accepted".to_string()));
    }

    tracing::debug!(name = %name, bytes = body.len(), "Receiving CSV upload");
    let outcome = state
        .datasets
        .ingest_csv_blocking(name, body, DatasetSource::Upload)
        .await?;

    Ok(load_response(outcome))
}

/// 从对象存储导入
pub async fn import_object(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportObjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let outcome = state.datasets.import_object(&req.key).await?;
    Ok(load_response(outcome))
}

/// 从数据库导入表或配置的查询
pub async fn import_database(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportDatabaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    if state.db.is_none() {
        return Err(AppError::ServiceUnavailable("Database is not configured".to_string()));
    }

    let source = TableSource::resolve(
        req.table.as_deref(),
        state.config.database.source_query.as_deref(),
    )?;
    let max_rows = req
        .limit
        .unwrap_or(state.config.database.max_rows)
        .min(state.config.database.max_rows);

    let outcome = state.datasets.import_table(source, max_rows).await?;
    Ok(load_response(outcome))
}

/// 列出对象存储中的 CSV
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let objects = state.datasets.list_objects(&query.prefix).await?;
    Ok(Json(json!({
        "storage": state.objects.kind().as_str(),
        "objects": objects,
        "count": objects.len(),
    })))
}

/// 列出已缓存的数据集
pub async fn list_datasets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let datasets: Vec<_> = state
        .datasets
        .store()
        .list()
        .iter()
        .map(|d| d.info())
        .collect();

    Json(json!({
        "count": datasets.len(),
        "datasets": datasets,
    }))
}

/// 数据集详情
pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let dataset = state
        .datasets
        .store()
        .get(id)
        .ok_or_else(|| AppError::not_found("Dataset"))?;
    Ok(Json(dataset.info()))
}

/// 从缓存中删除数据集
pub async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .datasets
        .store()
        .remove(id)
        .ok_or_else(|| AppError::not_found("Dataset"))?;

    tracing::info!(dataset_id = %id, "Dataset removed");
    Ok(StatusCode::NO_CONTENT)
}
