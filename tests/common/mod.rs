//! 测试公共模块
//! 提供测试配置、应用状态与请求辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use netflix_dashboard::{
    config::{
        AppConfig, DashboardConfig, DatabaseConfig, LocalStorageConfig, LoggingConfig,
        S3StorageConfig, ServerConfig, StorageConfig, StorageType,
    },
    middleware::AppState,
    routes,
    services::{DatasetService, DatasetStore},
    storage::LocalObjectStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

/// 与 Kaggle 数据集同结构的小样本
pub const SAMPLE_CSV: &str = "\
show_id,type,title,release_year,duration,rating
s1,Movie,Dick Johnson Is Dead,2020,90 min,PG-13
s2,TV Show,Blood & Water,2021,2 Seasons,TV-MA
s3,TV Show,Ganglands,2021,1 Season,TV-MA
s4,Movie,Sankofa,1993,125 min,TV-MA
s5,Movie,The Starling,2021,104 min,PG-13
s6,TV Show,Kota Factory,2019,2 Seasons,TV-MA
s7,Movie,Confessions of an Invisible Girl,2021,91 min,TV-PG
";

/// 创建测试配置，本地存储指向 `base_path`
pub fn create_test_config(base_path: &Path) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            address: "127.0.0.1".to_string(),
            port: 8501,
            graceful_shutdown_timeout_secs: 5,
            max_upload_mb: 1,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            source_query: None,
            max_rows: 1000,
        },
        storage: StorageConfig {
            storage_type: StorageType::Local,
            local: LocalStorageConfig {
                base_path: base_path.to_string_lossy().into_owned(),
            },
            s3: S3StorageConfig {
                region: None,
                endpoint: None,
                bucket: "dashboard-data".to_string(),
                access_key: None,
                secret_key: None,
            },
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        dashboard: DashboardConfig {
            pairplot_default_rows: 1000,
            sample_seed: 42,
            cache_capacity: 8,
        },
    }
}

/// 创建独立的临时数据目录
pub fn temp_data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dashboard-api-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

/// 不带数据库的应用
pub fn create_test_app(base_path: &Path) -> Router {
    let config = create_test_config(base_path);
    let objects = Arc::new(LocalObjectStore::new(&config.storage.local));
    let store = Arc::new(DatasetStore::new(config.dashboard.cache_capacity));
    let datasets = Arc::new(DatasetService::new(store, objects.clone(), None));

    let state = Arc::new(AppState {
        config,
        db: None,
        objects,
        datasets,
    });

    routes::create_router(state)
}

/// 发送请求并返回 (状态码, 响应体字节, content-type)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, String) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes()
        .to_vec();
    (status, bytes, content_type)
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes, _) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes, _) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

/// 上传 CSV，返回 (状态码, 响应 JSON)
pub async fn upload_csv(app: &Router, name: &str, csv: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/datasets?name={}", name))
        .header("content-type", "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap();
    let (status, bytes, _) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

/// 上传样本并返回数据集 id
pub async fn upload_sample(app: &Router) -> String {
    let (status, json) = upload_csv(app, "netflix_titles.csv", SAMPLE_CSV).await;
    assert!(status == StatusCode::CREATED || status == StatusCode::OK, "upload failed: {}", json);
    json["dataset"]["id"].as_str().expect("dataset id").to_string()
}
