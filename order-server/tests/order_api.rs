//! HTTP 查询端到端测试
//!
//! 消息经总线进入流水线，再通过路由查询：
//! - o1 摄取后 → 200 且 JSON 与发布内容一致
//! - ghost → 404
//! - 缺少 id / id 为空 → 400

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use order_server::services::http::build_router;
use order_server::{Config, MessageJournal, RedbOrderStore, ServerState};
use shared::order::Order;
use tower::ServiceExt;

const MODEL: &str = include_str!("../../fixtures/model.json");

fn in_memory_state() -> ServerState {
    let config = Config::with_overrides("./target/order-api-test", 0, 0);
    let store = RedbOrderStore::open_in_memory().unwrap();
    let journal = MessageJournal::open_in_memory().unwrap();
    ServerState::new(config, Arc::new(store), journal)
}

/// Wait until the pipeline has cached `order_uid`
async fn wait_cached(state: &ServerState, order_uid: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while state.cache.get(order_uid).is_none() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "order {} was never cached",
            order_uid
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn get(state: &ServerState, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = build_router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_ingested_order_is_served() {
    let state = in_memory_state();
    let channel = state.config.order_channel.clone();

    let subscription = state
        .bus
        .subscribe(&channel, &state.config.durable_name)
        .unwrap();
    let pipeline = tokio::spawn(
        state
            .pipeline()
            .run(subscription, state.shutdown_token.clone()),
    );

    let o1 = br#"{"order_uid":"o1","track_number":"T1","entry":"WBIL","items":[]}"#;
    state.bus.publish(&channel, b"{invalid json").unwrap();
    state.bus.publish(&channel, o1).unwrap();
    wait_cached(&state, "o1").await;

    let (status, body) = get(&state, "/api/order?id=o1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_uid"], "o1");
    assert_eq!(body["track_number"], "T1");
    assert_eq!(body["entry"], "WBIL");
    assert_eq!(body["items"], serde_json::json!([]));

    let (status, body) = get(&state, "/api/order?id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E0003");

    let (status, _) = get(&state, "/api/order").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&state, "/api/order?id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the malformed message never reached the cache
    assert_eq!(state.cache.count(), 1);

    state.shutdown();
    pipeline.await.unwrap();
}

#[tokio::test]
async fn test_full_model_round_trips_through_http() {
    let state = in_memory_state();
    let channel = state.config.order_channel.clone();

    let subscription = state
        .bus
        .subscribe(&channel, &state.config.durable_name)
        .unwrap();
    let pipeline = tokio::spawn(
        state
            .pipeline()
            .run(subscription, state.shutdown_token.clone()),
    );

    state.bus.publish(&channel, MODEL.as_bytes()).unwrap();
    wait_cached(&state, "b563feb7b2b84b6test").await;

    let (status, body) = get(&state, "/api/order?id=b563feb7b2b84b6test").await;
    assert_eq!(status, StatusCode::OK);

    let served: Order = serde_json::from_value(body).unwrap();
    let published: Order = serde_json::from_str(MODEL).unwrap();
    assert_eq!(served, published);
    assert_eq!(served.payment.amount, 1817);

    state.shutdown();
    pipeline.await.unwrap();
}

#[tokio::test]
async fn test_health_reports_cache_and_bus() {
    let state = in_memory_state();
    let channel = state.config.order_channel.clone();
    state.bus.publish(&channel, b"{}").unwrap();

    let (status, body) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cached_orders"], 0);

    let (status, body) = get(&state, "/health/detailed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"]["status"], "ok");
    assert_eq!(body["checks"]["message_bus"]["head_sequence"], 1);
}
