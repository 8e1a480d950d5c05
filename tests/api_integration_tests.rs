//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle of the coordinator façade over two
//! in-process memory nodes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dist_cache::{api::create_router, AppState, Backend, DistributedCache, MemoryBackend};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

struct TestApp {
    router: Router,
    nodes: Vec<MemoryBackend>,
}

fn create_test_app() -> TestApp {
    let nodes = vec![MemoryBackend::new("node1"), MemoryBackend::new("node2")];
    let cache = DistributedCache::new(
        nodes
            .iter()
            .map(|n| (n.name().to_string(), Arc::new(n.clone()) as Arc<dyn Backend>))
            .collect(),
        150,
    )
    .unwrap();

    TestApp {
        router: create_router(AppState::new(cache)),
        nodes,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// == Put Endpoint Tests ==

#[tokio::test]
async fn test_put_endpoint_replicates_to_every_node() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/api/cache/user:1",
        Some(r#"{"value":{"name":"Alice"},"ttl_seconds":60}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["replicated"].as_array().unwrap().len(), 1);
    assert!(json["data"]["failed"].as_array().unwrap().is_empty());

    for node in &app.nodes {
        assert!(node.exists("user:1").await.unwrap());
    }
}

#[tokio::test]
async fn test_put_endpoint_accepts_camel_case_ttl() {
    let app = create_test_app();

    let (status, _) = send(&app, "POST", "/api/cache/k", Some(r#"{"value":1,"ttlSeconds":30}"#)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_put_endpoint_negative_ttl() {
    let app = create_test_app();

    let (status, json) = send(&app, "POST", "/api/cache/k", Some(r#"{"value":1,"ttl_seconds":-1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_put_endpoint_key_too_long() {
    let app = create_test_app();
    let uri = format!("/api/cache/{}", "k".repeat(300));

    let (status, _) = send(&app, "POST", &uri, Some(r#"{"value":1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reserved_keys_rejected() {
    let app = create_test_app();

    for uri in ["/api/cache/lock:k", "/api/cache/.."] {
        let (status, json) = send(&app, "POST", uri, Some(r#"{"value":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["success"], false);
    }
    let (status, _) = send(&app, "GET", "/api/cache/lock:k", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "DELETE", "/api/cache/lock:k", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for node in &app.nodes {
        assert_eq!(node.key_count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_put_endpoint_fails_when_all_nodes_down() {
    let app = create_test_app();
    for node in &app.nodes {
        node.set_online(false);
    }

    let (status, json) = send(&app, "POST", "/api/cache/k", Some(r#"{"value":1}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"].as_str().unwrap().contains("Put failed"));
}

// == Get Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_round_trip() {
    let app = create_test_app();
    send(&app, "POST", "/api/cache/greeting", Some(r#"{"value":"hello"}"#)).await;

    let (status, json) = send(&app, "GET", "/api/cache/greeting", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], "hello");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/api/cache/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_get_endpoint_survives_replica_outage() {
    let app = create_test_app();
    let (_, json) = send(&app, "POST", "/api/cache/k", Some(r#"{"value":[1,2,3]}"#)).await;
    let primary = json["data"]["primary"].as_str().unwrap().to_string();

    // Only the primary is consulted on reads
    for node in app.nodes.iter().filter(|n| n.name() != primary) {
        node.set_online(false);
    }

    let (status, json) = send(&app, "GET", "/api/cache/k", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([1, 2, 3]));
}

// == Delete / Exists Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();
    send(&app, "POST", "/api/cache/k", Some(r#"{"value":true}"#)).await;

    let (status, json) = send(&app, "DELETE", "/api/cache/k", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], true);

    let (status, _) = send(&app, "DELETE", "/api/cache/k", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for node in &app.nodes {
        assert_eq!(node.key_count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_head_endpoint() {
    let app = create_test_app();

    let (status, _) = send(&app, "HEAD", "/api/cache/k", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "POST", "/api/cache/k", Some(r#"{"value":null}"#)).await;
    let (status, _) = send(&app, "HEAD", "/api/cache/k", None).await;
    assert_eq!(status, StatusCode::OK);
}

// == Stats / Clear Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    send(&app, "POST", "/api/cache/a", Some(r#"{"value":1}"#)).await;
    send(&app, "POST", "/api/cache/b", Some(r#"{"value":2}"#)).await;

    let (status, json) = send(&app, "GET", "/api/cache/stats/node1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["nodeId"], "node1");
    assert_eq!(json["data"]["connected"], true);
    assert_eq!(json["data"]["keyCount"], 2);
    assert!(json["data"]["usedMemory"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_stats_endpoint_offline_node() {
    let app = create_test_app();
    app.nodes[1].set_online(false);

    let (status, json) = send(&app, "GET", "/api/cache/stats/node2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["error"].as_str().is_some());
    assert!(json["data"].get("keyCount").is_none());
}

#[tokio::test]
async fn test_stats_endpoint_unknown_node() {
    let app = create_test_app();

    let (status, _) = send(&app, "GET", "/api/cache/stats/node9", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_test_app();
    send(&app, "POST", "/api/cache/a", Some(r#"{"value":1}"#)).await;
    send(&app, "POST", "/api/cache/b", Some(r#"{"value":2}"#)).await;

    let (status, _) = send(&app, "DELETE", "/api/cache/clear", None).await;
    assert_eq!(status, StatusCode::OK);

    for node in &app.nodes {
        assert_eq!(node.key_count().await.unwrap(), 0);
    }
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
