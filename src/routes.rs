//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes();

    // 页面与探针
    let public_routes = Router::new()
        .route("/", get(handlers::page::dashboard))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 数据集加载与管理
    let dataset_routes = Router::new()
        .route(
            "/api/v1/datasets",
            get(handlers::datasets::list_datasets).post(handlers::datasets::upload_dataset),
        )
        .route(
            "/api/v1/datasets/import/object",
            post(handlers::datasets::import_object),
        )
        .route(
            "/api/v1/datasets/import/database",
            post(handlers::datasets::import_database),
        )
        .route(
            "/api/v1/datasets/{id}",
            get(handlers::datasets::get_dataset).delete(handlers::datasets::delete_dataset),
        )
        .route("/api/v1/objects", get(handlers::datasets::list_objects));

    // 视图与图表
    let analytics_routes = Router::new()
        .route("/api/v1/datasets/{id}/preview", get(handlers::analytics::preview))
        .route("/api/v1/datasets/{id}/summary", get(handlers::analytics::summary))
        .route("/api/v1/datasets/{id}/trends", get(handlers::analytics::trends))
        .route("/api/v1/datasets/{id}/pairplot", get(handlers::analytics::pairplot))
        .route(
            "/api/v1/datasets/{id}/correlations",
            get(handlers::analytics::correlations),
        )
        .route("/api/v1/datasets/{id}/scatter", get(handlers::analytics::scatter))
        .route(
            "/api/v1/datasets/{id}/charts/{kind}",
            get(handlers::charts::render_chart),
        );

    // 指标端点
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_export));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(dataset_routes)
        .merge(analytics_routes)
        .merge(metrics_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
