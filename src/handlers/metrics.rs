//! 指标处理器
//! 提供 /metrics 端点

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{middleware::AppState, telemetry};

/// 指标响应
#[derive(Serialize)]
pub struct MetricsResponse {
    pub datasets_cached: usize,
    pub dataset_cache_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_pool_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_pool_idle: Option<u32>,
    pub process_uptime_secs: u64,
}

/// 指标暴露端点
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        datasets_cached: state.datasets.store().len(),
        dataset_cache_capacity: state.config.dashboard.cache_capacity,
        db_pool_size: state.db.as_ref().map(|pool| pool.size()),
        db_pool_idle: state.db.as_ref().map(|pool| pool.num_idle() as u32),
        process_uptime_secs: telemetry::uptime_secs(),
    })
}
