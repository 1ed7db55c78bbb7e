//! Handler-level tests over the in-memory store: webhook dedupe and
//! resubmission behavior, and the query endpoint's failure shape.

use std::sync::Arc;

use axum::body::{to_bytes, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use dg_datastore::{DataStore, MemoryStore};
use dg_domain::config::Config;
use dg_gateway::api::{query, webhooks};
use dg_gateway::dedupe::DedupeStore;
use dg_gateway::state::AppState;
use dg_pipeline::CallPipeline;
use dg_retrieval::{ContextAssembler, ResponseSynthesizer};

fn app_state(memory: Arc<MemoryStore>) -> AppState {
    let config = Arc::new(Config::default());
    let store: Arc<dyn DataStore> = memory;
    AppState {
        pipeline: Arc::new(CallPipeline::new(&config, store.clone(), None)),
        assembler: Arc::new(ContextAssembler::new(
            store.clone(),
            None,
            config.llm.embedding_model.clone(),
            config.retrieval.clone(),
        )),
        synthesizer: Arc::new(ResponseSynthesizer::new(
            None,
            config.llm.chat_model.clone(),
            &config.retrieval,
        )),
        dedupe: Arc::new(DedupeStore::new(config.pipeline.dedupe_ttl_secs)),
        config,
        store,
        provider: None,
        api_token_hash: None,
        webhook_secret: None,
    }
}

fn call_payload(call_id: &str) -> Bytes {
    serde_json::json!({
        "callId": call_id,
        "customerPhone": "+15551234567",
        "transcript": "I want to form an LLC in Texas"
    })
    .to_string()
    .into()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn duplicate_delivery_acknowledged_without_reprocessing() {
    let memory = Arc::new(MemoryStore::new());
    let state = app_state(memory.clone());

    let first = webhooks::receive_call(
        State(state.clone()),
        HeaderMap::new(),
        call_payload("call-1"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["processing"]["success"], true);

    let second = webhooks::receive_call(
        State(state.clone()),
        HeaderMap::new(),
        call_payload("call-1"),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["duplicate"], true);
    assert_eq!(memory.conversation_count(), 1);
}

#[tokio::test]
async fn resubmission_after_partial_persistence_reprocesses() {
    let memory = Arc::new(MemoryStore::new());
    let state = app_state(memory.clone());

    memory.fail_op("insert_legacy_record");
    let first = webhooks::receive_call(
        State(state.clone()),
        HeaderMap::new(),
        call_payload("call-1"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["processing"]["success"], false);
    assert_eq!(memory.legacy_count(), 0);

    // The outage clears; resubmitting the original payload must run the
    // pipeline again, not be swallowed as a duplicate.
    memory.clear_failure("insert_legacy_record");
    let retry = webhooks::receive_call(
        State(state.clone()),
        HeaderMap::new(),
        call_payload("call-1"),
    )
    .await;
    assert_eq!(retry.status(), StatusCode::OK);
    let body = body_json(retry).await;
    assert!(body.get("duplicate").is_none());
    assert_eq!(body["processing"]["success"], true);
    assert_eq!(memory.legacy_count(), 1);

    // With the call fully persisted, a further redelivery is a duplicate.
    let third = webhooks::receive_call(
        State(state.clone()),
        HeaderMap::new(),
        call_payload("call-1"),
    )
    .await;
    assert_eq!(body_json(third).await["duplicate"], true);
}

#[tokio::test]
async fn malformed_query_body_gets_structured_error() {
    let state = app_state(Arc::new(MemoryStore::new()));

    let response = query::query(State(state), Bytes::from_static(b"{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid request");
    assert!(body["details"].is_string());
}
