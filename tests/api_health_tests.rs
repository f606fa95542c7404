//! 健康检查 API 集成测试

use axum::http::StatusCode;

mod common;
use common::{create_test_app, get_json, temp_data_dir, upload_sample};

#[tokio::test]
async fn test_health_endpoint() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = get_json(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    let checks = json["checks"].as_array().unwrap();
    // 未配置数据库时只检查存储
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0]["name"], "storage:local");
    assert_eq!(checks[0]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_reports_missing_storage() {
    let dir = std::env::temp_dir().join(format!("dashboard-missing-{}", uuid::Uuid::new_v4()));
    let app = create_test_app(&dir);

    let (_, json) = get_json(&app, "/ready").await;

    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"][0]["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);
    upload_sample(&app).await;

    let (status, json) = get_json(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["datasets_cached"], 1);
    assert_eq!(json["dataset_cache_capacity"], 8);
    assert!(json.get("db_pool_size").is_none());
}

#[tokio::test]
async fn test_request_tracking_headers() {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-from-client")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-from-client");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_dashboard_page() {
    use axum::{body::Body, http::Request};

    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, bytes, content_type) = common::send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("Netflix Data Dashboard"));
}
