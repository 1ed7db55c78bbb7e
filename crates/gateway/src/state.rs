use std::sync::Arc;

use dg_datastore::DataStore;
use dg_domain::config::Config;
use dg_pipeline::CallPipeline;
use dg_providers::LlmProvider;
use dg_retrieval::{ContextAssembler, ResponseSynthesizer};

use crate::dedupe::DedupeStore;

/// Shared application state passed to all API handlers.
///
/// Long-lived client handles only; per-request state lives on the stack.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DataStore>,
    /// `None` = degraded mode: fallback extraction, no vectors, apology
    /// answers.
    pub provider: Option<Arc<dyn LlmProvider>>,

    pub pipeline: Arc<CallPipeline>,
    pub assembler: Arc<ContextAssembler>,
    pub synthesizer: Arc<ResponseSynthesizer>,

    /// Idempotency store for webhook call-ID deduplication.
    pub dedupe: Arc<DedupeStore>,

    // ── Security (startup-computed) ──────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
    /// Webhook HMAC secret. `None` = signature verification disabled.
    pub webhook_secret: Option<Arc<String>>,
}
