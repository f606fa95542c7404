//! 分析接口：每次请求都在缓存数据集上重建视图后聚合

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    analytics::{
        self, pairplot::PAIRPLOT_ROW_STEP, ColumnMapping, ContentFilter, PairplotData, ScatterData,
    },
    error::AppError,
    frame::Frame,
    middleware::AppState,
    services::Dataset,
};

use super::run_blocking;

const DEFAULT_PREVIEW_ROWS: usize = 20;
const MAX_PREVIEW_ROWS: usize = 500;

/// 视图参数，所有分析接口共用
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ViewQuery {
    #[validate(length(max = 32))]
    pub content_type: Option<String>,
    #[validate(length(max = 255))]
    pub release_col: Option<String>,
    #[validate(length(max = 255))]
    pub duration_col: Option<String>,
    #[validate(length(max = 255))]
    pub type_col: Option<String>,
}

impl ViewQuery {
    pub fn filter(&self) -> Result<ContentFilter, AppError> {
        Ok(self
            .content_type
            .as_deref()
            .unwrap_or_default()
            .parse::<ContentFilter>()?)
    }

    pub fn mapping(&self) -> ColumnMapping {
        ColumnMapping {
            release_col: self.release_col.clone(),
            duration_col: self.duration_col.clone(),
            type_col: self.type_col.clone(),
        }
        .normalized()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreviewQuery {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
}

fn validate_row_step(rows: usize) -> Result<(), ValidationError> {
    if rows % PAIRPLOT_ROW_STEP == 0 {
        Ok(())
    } else {
        Err(ValidationError::new("rows_step"))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PairplotQuery {
    /// 逗号分隔的列名
    #[validate(length(max = 2048))]
    pub columns: Option<String>,
    #[validate(range(min = 200, max = 5000), custom(function = validate_row_step))]
    pub rows: Option<usize>,
}

impl PairplotQuery {
    fn selection(&self) -> Vec<String> {
        self.columns
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ScatterQuery {
    #[validate(length(min = 1, max = 255))]
    pub y: Option<String>,
    pub regression: Option<bool>,
}

/// 取数据集并按请求参数构建视图
pub(crate) async fn load_view(
    state: &AppState,
    id: Uuid,
    query: &ViewQuery,
) -> Result<(Arc<Dataset>, Frame), AppError> {
    query.validate()?;
    let dataset = state
        .datasets
        .store()
        .get(id)
        .ok_or_else(|| AppError::not_found("Dataset"))?;

    let mapping = query.mapping();
    let filter = query.filter()?;
    let source = dataset.clone();
    let view = run_blocking(move || {
        Ok(analytics::prepare_view(&source.frame, &mapping, filter)?)
    })
    .await?;
    Ok((dataset, view))
}

pub(crate) fn build_pairplot(
    state: &AppState,
    view: &Frame,
    query: &PairplotQuery,
) -> Result<PairplotData, AppError> {
    query.validate()?;
    let rows = query.rows.unwrap_or(state.config.dashboard.pairplot_default_rows);
    Ok(analytics::pairplot(
        view,
        &query.selection(),
        rows,
        state.config.dashboard.sample_seed,
    )?)
}

pub(crate) fn build_scatter(view: &Frame, query: &ScatterQuery) -> Result<ScatterData, AppError> {
    query.validate()?;
    Ok(analytics::scatter(
        view,
        query.y.as_deref(),
        query.regression.unwrap_or(false),
    )?)
}

/// 视图前若干行
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let (dataset, view) = load_view(&state, id, &view_query).await?;
    let limit = query.limit.unwrap_or(DEFAULT_PREVIEW_ROWS).min(MAX_PREVIEW_ROWS);
    let head = view.head(limit);

    let rows: Vec<serde_json::Value> = (0..head.len())
        .map(|row| {
            let record: serde_json::Map<String, serde_json::Value> = head
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.json_value(row)))
                .collect();
            serde_json::Value::Object(record)
        })
        .collect();

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "columns": head.column_names(),
        "total_rows": view.len(),
        "rows": rows,
    })))
}

/// 指标卡
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (dataset, view) = load_view(&state, id, &view_query).await?;
    let kpis = run_blocking(move || Ok(analytics::compute_kpis(&view))).await?;
    Ok(Json(json!({
        "dataset_id": dataset.id,
        "content_type": view_query.filter()?,
        "kpis": kpis,
    })))
}

/// 每年标题数
pub async fn trends(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (dataset, view) = load_view(&state, id, &view_query).await?;
    let filter = view_query.filter()?;
    let counts = run_blocking(move || Ok(analytics::count_by_year(&view, filter))).await?;
    Ok(Json(json!({
        "dataset_id": dataset.id,
        "content_type": filter,
        "counts": counts,
    })))
}

pub async fn pairplot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
    Query(query): Query<PairplotQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (_, view) = load_view(&state, id, &view_query).await?;
    let data = run_blocking(move || build_pairplot(&state, &view, &query)).await?;
    Ok(Json(data))
}

pub async fn correlations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (_, view) = load_view(&state, id, &view_query).await?;
    let matrix = run_blocking(move || Ok(analytics::correlation_matrix(&view)?)).await?;
    Ok(Json(matrix))
}

pub async fn scatter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(view_query): Query<ViewQuery>,
    Query(query): Query<ScatterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (_, view) = load_view(&state, id, &view_query).await?;
    let data = run_blocking(move || build_scatter(&view, &query)).await?;
    Ok(Json(data))
}
