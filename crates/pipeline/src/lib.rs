//! `dg-pipeline` — the call-ingestion pipeline.
//!
//! One webhook flows through five stages: payload normalization
//! ([`schema`]), identity resolution ([`identity`]), fact extraction
//! ([`extract`] with the [`fallback`] branch), embedding generation
//! ([`embed`]), and multi-store persistence ([`persist`]). Only a missing
//! identifier or transcript aborts the request; everything downstream
//! degrades with logging.

pub mod embed;
pub mod extract;
pub mod fallback;
pub mod identity;
pub mod persist;
pub mod schema;

pub use persist::{PersistOutcome, WriteAttempt};
pub use schema::{NormalizedCall, WebhookPayload};

use std::sync::Arc;

use chrono::Utc;

use dg_datastore::DataStore;
use dg_domain::config::Config;
use dg_domain::error::Result;
use dg_domain::record::ConversationRecord;
use dg_providers::LlmProvider;

use embed::EmbeddingGenerator;
use extract::FactExtractor;
use identity::IdentityResolver;
use persist::PersistenceCoordinator;

/// What one processed webhook produced, as reported back to the caller.
#[derive(Debug, Clone)]
pub struct ProcessingSummary {
    pub call_id: String,
    pub user_id: String,
    pub call_stage: u8,
    pub extracted_fields: usize,
    pub vectors_generated: usize,
    pub transcript_length: usize,
    pub outcome: PersistOutcome,
}

/// The end-to-end ingestion pipeline. One instance serves all requests;
/// per-request state lives on the stack.
pub struct CallPipeline {
    resolver: IdentityResolver,
    extractor: FactExtractor,
    embedder: EmbeddingGenerator,
    coordinator: PersistenceCoordinator,
}

impl CallPipeline {
    pub fn new(
        config: &Config,
        store: Arc<dyn DataStore>,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(store.clone(), config.pipeline.create_missing_users),
            extractor: FactExtractor::new(provider.clone(), config.llm.chat_model.clone()),
            embedder: EmbeddingGenerator::new(
                provider,
                config.llm.embedding_model.clone(),
                config.llm.embedding_dimensions,
                config.llm.chat_model.clone(),
                config.pipeline.summary_max_tokens,
            ),
            coordinator: PersistenceCoordinator::new(store, config.pipeline.mark_determined_stage),
        }
    }

    /// Process one raw webhook body.
    ///
    /// The only error path is [`dg_domain::error::Error::Input`]; every
    /// other failure mode degrades and is reflected in the summary.
    pub async fn process(&self, body: &[u8]) -> Result<ProcessingSummary> {
        let call = schema::normalize(schema::decode(body)?)?;
        self.process_normalized(call).await
    }

    pub async fn process_normalized(&self, call: NormalizedCall) -> Result<ProcessingSummary> {
        let resolved = self.resolver.resolve(&call.identifier).await;

        // Stage: payload hint wins; otherwise the user's first incomplete
        // stage; a brand-new or unresolved user starts at 1.
        let call_stage = call
            .call_stage
            .filter(|s| (1..=4).contains(s))
            .or_else(|| {
                resolved
                    .profile
                    .as_ref()
                    .map(|p| p.first_incomplete_stage())
            })
            .unwrap_or(1);

        let record = ConversationRecord {
            id: call.call_id.clone(),
            user_id: resolved.user_id.clone(),
            call_session_id: call.call_session_id.clone(),
            call_stage,
            full_transcript: call.full_transcript.clone(),
            turns: call.turns.clone(),
            created_at: Utc::now(),
        };

        let user_text = if call.user_messages.is_empty() {
            call.full_transcript.clone()
        } else {
            call.user_messages.join("\n")
        };
        let facts = self.extractor.extract(&record.id, &user_text).await;
        let embeddings = self.embedder.generate(&record).await;

        let outcome = self
            .coordinator
            .persist(&record, &facts, &embeddings, resolved.profile)
            .await;

        Ok(ProcessingSummary {
            call_id: record.id,
            user_id: resolved.user_id,
            call_stage,
            extracted_fields: facts.fields_present(),
            vectors_generated: embeddings.vectors_generated(),
            transcript_length: record.full_transcript.len(),
            outcome,
        })
    }
}
