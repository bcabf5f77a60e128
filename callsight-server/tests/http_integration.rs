//! HTTP integration tests for the Callsight dashboard
//!
//! Each test builds its own scratch dataset and forest artifact in a temp
//! directory and drives the full router with `oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use callsight_core::config::{DatasetConfig, ModelBackend, ModelConfig};
use callsight_core::{load_dataset, CallsightConfig, FEATURE_COLUMNS};
use callsight_server::http::{build_router, HttpState};
use serde_json::json;
use tower::ServiceExt;

const DATASET: &str = "\
Call Id,Agent,Topic,Speed of answer in seconds,AvgTalkDuration,Resolved,Satisfaction rating
ID0001,Alice,Billing,20,00:02:00,Y,5
ID0002,Bob,Streaming,35,00:05:10,N,
ID0003,Alice,Streaming,67,00:01:15,Y,3
";

/// Rating 5 for talks up to 150 s, rating 2 above.
fn write_model(dir: &Path) -> String {
    let path = dir.join("model.json");
    let model = json!({
        "feature_names": FEATURE_COLUMNS,
        "classes": [1, 2, 3, 4, 5],
        "trees": [{ "nodes": [
            { "kind": "split", "feature": 3, "threshold": 150.0, "left": 1, "right": 2 },
            { "kind": "leaf", "value": [0, 0, 1, 2, 9] },
            { "kind": "leaf", "value": [1, 7, 2, 0, 0] },
        ]}],
    });
    std::fs::write(&path, model.to_string()).unwrap();
    path.display().to_string()
}

fn make_app(dir: &Path) -> Router {
    let data = dir.join("calls.csv");
    std::fs::write(&data, DATASET).unwrap();
    let config = CallsightConfig {
        dataset: DatasetConfig {
            path: data.display().to_string(),
        },
        model: ModelConfig {
            backend: ModelBackend::Forest,
            path: write_model(dir),
            onnx_input_name: "float_input".to_string(),
        },
        ..Default::default()
    };
    build_router(Arc::new(HttpState::new(config)))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ===========================================================================
// JSON API
// ===========================================================================

#[tokio::test]
async fn test_version_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(make_app(dir.path()), get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_categories_endpoint_lists_sorted_classes() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(make_app(dir.path()), get("/api/categories")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["agents"], json!(["Alice", "Bob"]));
    assert_eq!(json["topics"], json!(["Billing", "Streaming"]));
}

#[tokio::test]
async fn test_predict_endpoint_runs_model() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(dir.path());

    let short = json!({"agent": "Bob", "topic": "Billing", "speed_of_answer": 12, "avg_talk_duration": 90.0});
    let (status, body) = send(app.clone(), post_json("/api/predict", short)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["prediction"], 5);
    assert_eq!(json["model"], "forest");

    let long = json!({"agent": "Bob", "topic": "Billing", "speed_of_answer": 12, "avg_talk_duration": 400.0});
    let (_, body) = send(app, post_json("/api/predict", long)).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["prediction"], 2);
}

#[tokio::test]
async fn test_predict_endpoint_unseen_topic() {
    let dir = tempfile::tempdir().unwrap();
    let req = json!({"agent": "Alice", "topic": "Refunds", "speed_of_answer": 12, "avg_talk_duration": 90.0});
    let (status, body) = send(make_app(dir.path()), post_json("/api/predict", req)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Refunds"));
}

#[tokio::test]
async fn test_predict_endpoint_corrupt_model() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(dir.path());
    std::fs::write(dir.path().join("model.json"), b"not a model").unwrap();

    let req = json!({"agent": "Alice", "topic": "Billing", "speed_of_answer": 12, "avg_talk_duration": 90.0});
    let (status, body) = send(app, post_json("/api/predict", req)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("corrupt"));
}

#[tokio::test]
async fn test_add_session_endpoint_appends_row() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(dir.path());

    let session = json!({
        "agent": "Alice",
        "topic": "Billing",
        "speed_of_answer": 12,
        "avg_talk_duration": 180.0,
        "satisfaction_rating": 4,
    });
    let (status, body) = send(app, post_json("/api/sessions", session)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["added"], true);
    assert_eq!(json["rows"], 4);

    let dataset = load_dataset(dir.path().join("calls.csv")).unwrap();
    assert_eq!(dataset.table.len(), 4);
    let last = dataset.table.records().last().unwrap();
    assert_eq!(dataset.agents.inverse_transform(last.agent).unwrap(), "Alice");
    assert_eq!(dataset.topics.inverse_transform(last.topic).unwrap(), "Billing");
    assert_eq!(last.avg_talk_duration, Some(180.0));
    assert_eq!(last.satisfaction_rating, 4);
}

#[tokio::test]
async fn test_concurrent_appends_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(dir.path());

    let mut handles = Vec::new();
    for rating in 1..=5u8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let session = json!({
                "agent": "Bob",
                "topic": "Streaming",
                "speed_of_answer": 30,
                "avg_talk_duration": 60.0,
                "satisfaction_rating": rating,
            });
            send(app, post_json("/api/sessions", session)).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let dataset = load_dataset(dir.path().join("calls.csv")).unwrap();
    assert_eq!(dataset.table.len(), 8);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(make_app(dir.path()), get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["by_agent"][0]["name"], "Alice");
    assert_eq!(json["by_agent"][0]["mean_rating"], 4.0);
    assert_eq!(json["rating_counts"][0], json!({"rating": 0, "count": 1}));
}

// ===========================================================================
// HTML pages
// ===========================================================================

#[tokio::test]
async fn test_home_page_has_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(make_app(dir.path()), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Call Center Operations Analysis"));
    for path in ["/predict", "/sessions/new", "/reports/1", "/reports/2"] {
        assert!(html.contains(&format!("href=\"{path}\"")), "missing link to {path}");
    }
}

#[tokio::test]
async fn test_predict_page_populates_selectors() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(make_app(dir.path()), get("/predict")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<option value=\"Alice\">Alice</option>"));
    assert!(html.contains("<option value=\"Streaming\">Streaming</option>"));
}

#[tokio::test]
async fn test_predict_form_shows_rating_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(
        make_app(dir.path()),
        post_form(
            "/predict",
            "agent=Alice&topic=Streaming&speed_of_answer=10&avg_talk_duration=60",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Predicted Satisfaction Rating: <strong>5</strong>"));
    assert!(html.contains("Average Satisfaction Rating by Topic"));
}

#[tokio::test]
async fn test_predict_form_unseen_agent_shows_error() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(
        make_app(dir.path()),
        post_form(
            "/predict",
            "agent=Eve&topic=Billing&speed_of_answer=10&avg_talk_duration=60",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(html.contains("Encoding error"));
    assert!(!html.contains("Predicted Satisfaction Rating"));
}

#[tokio::test]
async fn test_predict_form_with_empty_number_renders_error_in_page() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(
        make_app(dir.path()),
        post_form(
            "/predict",
            "agent=Alice&topic=Billing&speed_of_answer=&avg_talk_duration=60",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(html.contains("<p class=\"error\">Invalid input:"));
    assert!(html.contains("<h2>Navigation</h2>"));
    assert!(html.contains("<option value=\"Alice\">Alice</option>"));
}

#[tokio::test]
async fn test_add_session_form_with_negative_speed_renders_error_in_page() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(
        make_app(dir.path()),
        post_form(
            "/sessions/new",
            "agent=Bob&topic=Billing&speed_of_answer=-3&avg_talk_duration=180&satisfaction_rating=4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(html.contains("<p class=\"error\">Invalid input:"));
    assert!(html.contains("Add New Session"));

    let dataset = load_dataset(dir.path().join("calls.csv")).unwrap();
    assert_eq!(dataset.table.len(), 3);
}

#[tokio::test]
async fn test_add_session_form_keeps_fractional_durations() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = send(
        make_app(dir.path()),
        post_form(
            "/sessions/new",
            "agent=Bob&topic=Billing&speed_of_answer=12&avg_talk_duration=95.5&satisfaction_rating=4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let content = std::fs::read_to_string(dir.path().join("calls.csv")).unwrap();
    assert!(content.ends_with(",Bob,Billing,12,00:01:35.5,,4\n"));
}

#[tokio::test]
async fn test_add_session_form() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(
        make_app(dir.path()),
        post_form(
            "/sessions/new",
            "agent=Bob&topic=Billing&speed_of_answer=12&avg_talk_duration=180&satisfaction_rating=4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Session added successfully!"));

    let content = std::fs::read_to_string(dir.path().join("calls.csv")).unwrap();
    assert!(content.ends_with(",Bob,Billing,12,00:03:00,,4\n"));
}

#[tokio::test]
async fn test_report_page_embeds_iframe() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(make_app(dir.path()), get("/reports/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<iframe src=\"https://app.powerbi.com/view?r=YOUR_REPORT_ID\""));
}

#[tokio::test]
async fn test_unknown_path_is_404_page() {
    let dir = tempfile::tempdir().unwrap();
    let (status, html) = send(make_app(dir.path()), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page not found."));
}
