//! Call-completion webhook — `POST /v1/calls/webhook`.
//!
//! Auth is two-layered:
//!   1. Bearer token — handled by the `require_api_token` middleware
//!      (this route lives in the protected router).
//!   2. HMAC-SHA256 — when the webhook secret is configured, the handler
//!      also verifies `X-Signature: sha256=<hex>` against the raw body.
//!
//! Duplicate deliveries (same call ID inside the dedupe TTL) are
//! acknowledged without re-running the pipeline. A call whose processing
//! fails or only partially persists is released from the dedupe store, so
//! resubmitting the original payload reprocesses it.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use dg_domain::error::Error;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Verify an `X-Signature` header (`sha256=<hex>`, prefix optional)
/// against the raw request body. Constant-time comparison to prevent
/// timing attacks.
fn signature_valid(secret: &str, body: &[u8], sig_header: &str) -> bool {
    let sig_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());
    computed.as_bytes().ct_eq(sig_hex.as_bytes()).unwrap_u8() == 1
}

/// Build a standardized JSON error response: `{ "error", "details" }`.
fn api_error(status: StatusCode, error: &str, details: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": error, "details": details.into() })),
    )
        .into_response()
}

/// `POST /v1/calls/webhook`
pub async fn receive_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. Verify the HMAC signature when a secret is configured.
    if let Some(secret) = &state.webhook_secret {
        let sig_header = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !signature_valid(secret, &body, sig_header) {
            return api_error(
                StatusCode::UNAUTHORIZED,
                "invalid webhook signature",
                "X-Signature did not match the request body",
            );
        }
    }

    // 2. Decode and normalize before touching the dedupe store so a
    //    malformed payload never consumes a call ID.
    let call = match dg_pipeline::schema::decode(&body).and_then(dg_pipeline::schema::normalize) {
        Ok(call) => call,
        Err(Error::Input(details)) => {
            return api_error(StatusCode::BAD_REQUEST, "invalid payload", details);
        }
        Err(e) => {
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "ingestion failed", e.to_string());
        }
    };

    // 3. Duplicate delivery: acknowledge without reprocessing.
    if !state.dedupe.check_and_record(&call.call_id) {
        tracing::info!(call_id = %call.call_id, "duplicate webhook delivery acknowledged");
        return (
            StatusCode::OK,
            Json(serde_json::json!({
                "received": true,
                "timestamp": Utc::now().to_rfc3339(),
                "duplicate": true,
            })),
        )
            .into_response();
    }

    // 4. Run the pipeline. Any outcome short of a fully persisted call
    //    releases the ID so a resubmission is not swallowed as a duplicate.
    let call_id = call.call_id.clone();
    let summary = match state.pipeline.process_normalized(call).await {
        Ok(summary) => summary,
        Err(Error::Input(details)) => {
            state.dedupe.forget(&call_id);
            return api_error(StatusCode::BAD_REQUEST, "invalid payload", details);
        }
        Err(e) => {
            state.dedupe.forget(&call_id);
            tracing::error!(error = %e, "webhook processing failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "processing failed", e.to_string());
        }
    };
    if !summary.outcome.all_ok() {
        state.dedupe.forget(&summary.call_id);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "received": true,
            "timestamp": Utc::now().to_rfc3339(),
            "processing": {
                "success": summary.outcome.all_ok(),
                "callId": summary.call_id,
                "callStage": summary.call_stage,
                "extractedFields": summary.extracted_fields,
                "vectorsGenerated": summary.vectors_generated,
                "transcriptLength": summary.transcript_length,
            },
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrip_with_and_without_prefix() {
        let secret = "topsecret";
        let body = b"{\"callId\":\"c1\"}";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let hex_sig = hex::encode(mac.finalize().into_bytes());

        assert!(signature_valid(secret, body, &hex_sig));
        assert!(signature_valid(secret, body, &format!("sha256={hex_sig}")));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let secret = "topsecret";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"original");
        let hex_sig = hex::encode(mac.finalize().into_bytes());

        assert!(!signature_valid(secret, b"tampered", &hex_sig));
        assert!(!signature_valid(secret, b"original", ""));
    }
}
