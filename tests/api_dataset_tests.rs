//! 数据集加载 API 集成测试

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;

mod common;
use common::{
    create_test_app, get_json, post_json, send, temp_data_dir, upload_csv, upload_sample,
    SAMPLE_CSV,
};

#[tokio::test]
async fn test_upload_creates_dataset() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = upload_csv(&app, "netflix_titles.csv", SAMPLE_CSV).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["cached"], false);
    assert_eq!(json["dataset"]["name"], "netflix_titles.csv");
    assert_eq!(json["dataset"]["rows"], 7);
    assert_eq!(json["dataset"]["source"]["kind"], "upload");

    let columns = json["dataset"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 6);
    assert_eq!(columns[3]["name"], "release_year");
    assert_eq!(columns[3]["kind"], "numeric");
    assert_eq!(columns[4]["kind"], "text");
}

#[tokio::test]
async fn test_identical_upload_is_served_from_cache() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (_, first) = upload_csv(&app, "a.csv", SAMPLE_CSV).await;
    let (status, second) = upload_csv(&app, "b.csv", SAMPLE_CSV).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(first["dataset"]["id"], second["dataset"]["id"]);

    let (_, list) = get_json(&app, "/api/v1/datasets").await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn test_upload_rejects_non_csv_name() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = upload_csv(&app, "titles.xlsx", SAMPLE_CSV).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], 400);
}

#[tokio::test]
async fn test_upload_rejects_json_content_type() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/datasets?name=titles.csv")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_upload_reports_unreadable_csv() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = upload_csv(&app, "broken.csv", "a,b\n1,2,3\n").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Could not read the CSV"));

    let (status, _) = upload_csv(&app, "empty.csv", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let body = "x\n".repeat(1024 * 1024);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/datasets?name=big.csv")
        .header("content-type", "text/csv")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_and_delete_dataset() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);
    let id = upload_sample(&app).await;

    let (status, json) = get_json(&app, &format!("/api/v1/datasets/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/datasets/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = get_json(&app, &format!("/api/v1/datasets/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Dataset not found");
}

#[tokio::test]
async fn test_unknown_dataset_is_not_found() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let uri = format!("/api/v1/datasets/{}/summary", uuid::Uuid::new_v4());
    let (status, _) = get_json(&app, &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_object_from_local_storage() {
    let dir = temp_data_dir();
    std::fs::create_dir_all(dir.join("raw")).unwrap();
    std::fs::write(dir.join("raw/netflix_titles.csv"), SAMPLE_CSV).unwrap();
    std::fs::write(dir.join("raw/notes.txt"), "ignored").unwrap();
    let app = create_test_app(&dir);

    let (status, json) = get_json(&app, "/api/v1/objects?prefix=raw/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["storage"], "local");
    assert_eq!(json["count"], 1);
    assert_eq!(json["objects"][0]["key"], "raw/netflix_titles.csv");

    let (status, json) = post_json(
        &app,
        "/api/v1/datasets/import/object",
        json!({ "key": "raw/netflix_titles.csv" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["dataset"]["name"], "netflix_titles.csv");
    assert_eq!(json["dataset"]["source"]["kind"], "object");
    assert_eq!(json["dataset"]["source"]["key"], "raw/netflix_titles.csv");
}

#[tokio::test]
async fn test_import_missing_object() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = post_json(
        &app,
        "/api/v1/datasets/import/object",
        json!({ "key": "nope.csv" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Object 'nope.csv' not found");

    let (status, _) = post_json(
        &app,
        "/api/v1/datasets/import/object",
        json!({ "key": "../secrets.csv" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_database_without_pool() {
    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let (status, json) = post_json(
        &app,
        "/api/v1/datasets/import/database",
        json!({ "table": "netflix_titles" }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], 503);
}

#[tokio::test]
async fn test_error_request_id_matches_header() {
    use tower::ServiceExt;

    let dir = temp_data_dir();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/datasets/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"]["request_id"], header_id.as_str());
}
