//! `dg-providers` — LLM adapters for DreamGate.
//!
//! Provides the [`LlmProvider`] trait that abstracts over the completion +
//! embedding service, and an OpenAI-compatible HTTP adapter
//! ([`OpenAiCompatProvider`]). The pipeline never talks to a provider's wire
//! format directly; everything goes through the trait.

pub mod openai_compat;
pub mod traits;
pub mod util;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use openai_compat::OpenAiCompatProvider;
pub use traits::{
    ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, LlmProvider, Usage,
};

use std::sync::Arc;

use dg_domain::config::LlmConfig;
use dg_domain::error::Result;

/// Build a provider from the first configured entry.
///
/// Returns `None` when no providers are configured; the caller degrades
/// (fallback extraction, skipped vectors, apology responses) rather than
/// refusing to start.
pub fn create_provider(cfg: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    let Some(provider_cfg) = cfg.providers.first() else {
        tracing::warn!("no LLM providers configured; running in degraded mode");
        return Ok(None);
    };

    let provider = OpenAiCompatProvider::from_config(provider_cfg, cfg.default_timeout_ms)?;
    tracing::info!(provider = %provider_cfg.id, "LLM provider initialized");
    Ok(Some(Arc::new(provider)))
}
