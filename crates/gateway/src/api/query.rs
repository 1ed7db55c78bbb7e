//! RAG query endpoint — `POST /v1/rag/query`.
//!
//! Wire DTOs are camelCase; domain types stay snake_case. The response
//! always carries the gap report (`truthTableGaps`), even when every
//! retrieval source came back empty.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use dg_retrieval::AssemblyRequest;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub dream_id: Option<String>,
    #[serde(default = "d_stage")]
    pub call_stage: u8,
    #[serde(default = "d_true")]
    pub include_transcripts: bool,
    #[serde(default = "d_true")]
    pub include_knowledge: bool,
    #[serde(default = "d_true", rename = "includeDreamDNA")]
    pub include_dream_dna: bool,
}

fn d_stage() -> u8 {
    1
}
fn d_true() -> bool {
    true
}

/// `POST /v1/rag/query`
///
/// Decodes from the raw body (rather than the `Json` extractor) so a
/// malformed request gets the same `{error, details}` shape as every
/// other failure on this surface.
pub async fn query(State(state): State<AppState>, body: Bytes) -> Response {
    let body: QueryRequest = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "invalid request",
                    "details": e.to_string(),
                })),
            )
                .into_response();
        }
    };
    if body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid request",
                "details": "message must not be empty",
            })),
        )
            .into_response();
    }
    if !(1..=4).contains(&body.call_stage) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid request",
                "details": "callStage must be between 1 and 4",
            })),
        )
            .into_response();
    }

    let request = AssemblyRequest {
        message: body.message.clone(),
        user_id: body.user_id,
        dream_id: body.dream_id,
        call_stage: body.call_stage,
        include_transcripts: body.include_transcripts,
        include_knowledge: body.include_knowledge,
        include_dream_dna: body.include_dream_dna,
    };
    let (context, report) = state.assembler.assemble(&request).await;
    let answer = state.synthesizer.synthesize(&body.message, &context).await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "response": answer,
            "context": {
                "retrievedTranscripts": report.retrieved_transcripts,
                "retrievedKnowledge": report.retrieved_knowledge,
                "dreamDNAIncluded": report.dream_dna_included,
                "truthTableGaps": context.gaps,
            },
        })),
    )
        .into_response()
}
