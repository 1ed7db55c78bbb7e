//! Application state construction and background loops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use dg_domain::config::Config;
use dg_pipeline::CallPipeline;
use dg_retrieval::{ContextAssembler, ResponseSynthesizer};

use crate::dedupe::DedupeStore;
use crate::state::AppState;

const DEDUPE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Build the shared [`AppState`]: datastore, LLM provider, pipeline,
/// retrieval components, and startup-computed security material.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let store = dg_datastore::create_store(&config.datastore).context("datastore init")?;
    let provider = dg_providers::create_provider(&config.llm).context("provider init")?;

    let pipeline = Arc::new(CallPipeline::new(&config, store.clone(), provider.clone()));
    let assembler = Arc::new(ContextAssembler::new(
        store.clone(),
        provider.clone(),
        config.llm.embedding_model.clone(),
        config.retrieval.clone(),
    ));
    let synthesizer = Arc::new(ResponseSynthesizer::new(
        provider.clone(),
        config.llm.chat_model.clone(),
        &config.retrieval,
    ));

    let api_token_hash = read_token_hash(&config.server.api_token_env);
    if api_token_hash.is_none() {
        tracing::warn!(
            env = %config.server.api_token_env,
            "API token not set; protected routes are open (dev mode)"
        );
    }

    let webhook_secret = std::env::var(&config.pipeline.webhook_secret_env)
        .ok()
        .filter(|s| !s.is_empty())
        .map(Arc::new);
    if webhook_secret.is_none() {
        tracing::warn!(
            env = %config.pipeline.webhook_secret_env,
            "webhook secret not set; signature verification disabled"
        );
    }

    Ok(AppState {
        dedupe: Arc::new(DedupeStore::new(config.pipeline.dedupe_ttl_secs)),
        config,
        store,
        provider,
        pipeline,
        assembler,
        synthesizer,
        api_token_hash,
        webhook_secret,
    })
}

/// Spawn the long-lived background loops.
pub fn spawn_background_tasks(state: &AppState) {
    let dedupe = state.dedupe.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DEDUPE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            dedupe.sweep();
        }
    });
}

fn read_token_hash(env_var: &str) -> Option<Vec<u8>> {
    std::env::var(env_var)
        .ok()
        .filter(|t| !t.is_empty())
        .map(|t| Sha256::digest(t.as_bytes()).to_vec())
}
