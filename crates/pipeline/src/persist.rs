//! Multi-store persistence fan-out.
//!
//! One ingested call lands in four logically distinct stores plus the user
//! profile. Each write is attempted independently and captured in a
//! [`WriteAttempt`]; there is no transactional rollback. A failed write is
//! logged with enough context (user id, call id) for manual reprocessing.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use dg_datastore::{DataStore, LegacyCallRecord, SessionProgress, VectorRecord};
use dg_domain::error::{Error, Result};
use dg_domain::record::{ConversationRecord, EmbeddingSet, ExtractedFacts, UserProfile};
use dg_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The result of one store write.
#[derive(Debug, Clone)]
pub struct WriteAttempt {
    pub store: &'static str,
    pub ok: bool,
    pub error: Option<String>,
}

/// Aggregated outcome of the fan-out. Always contains one attempt per
/// target store, in write order.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub attempts: Vec<WriteAttempt>,
}

impl PersistOutcome {
    pub fn all_ok(&self) -> bool {
        self.attempts.iter().all(|a| a.ok)
    }

    pub fn failed_stores(&self) -> Vec<&'static str> {
        self.attempts
            .iter()
            .filter(|a| !a.ok)
            .map(|a| a.store)
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Coordinator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PersistenceCoordinator {
    store: Arc<dyn DataStore>,
    /// When `true`, mark the stage determined for this call; when `false`,
    /// always mark stage 1 (legacy behavior).
    mark_determined_stage: bool,
}

impl PersistenceCoordinator {
    pub fn new(store: Arc<dyn DataStore>, mark_determined_stage: bool) -> Self {
        Self {
            store,
            mark_determined_stage,
        }
    }

    /// Fan out one ingested call to all stores.
    ///
    /// `profile` is the resolved user profile when one exists; facts are
    /// merged into it and the completed stage flagged before upsert.
    pub async fn persist(
        &self,
        record: &ConversationRecord,
        facts: &ExtractedFacts,
        embeddings: &EmbeddingSet,
        profile: Option<UserProfile>,
    ) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        self.attempt(&mut outcome, "raw_archive", async {
            self.store.insert_conversation(record.clone()).await
        })
        .await;

        self.attempt(&mut outcome, "vector_store", async {
            self.store
                .insert_vector_record(vector_row(record, facts, embeddings))
                .await
        })
        .await;

        self.attempt(&mut outcome, "session_tracker", async {
            self.store
                .upsert_session_progress(SessionProgress {
                    user_id: record.user_id.clone(),
                    session_id: record.call_session_id.clone(),
                    call_stage: record.call_stage,
                    last_call_id: record.id.clone(),
                    updated_at: Utc::now(),
                })
                .await
        })
        .await;

        self.attempt(&mut outcome, "legacy_records", async {
            self.store
                .insert_legacy_record(LegacyCallRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: record.user_id.clone(),
                    call_id: record.id.clone(),
                    call_stage: record.call_stage,
                    transcript: record.full_transcript.clone(),
                    facts: facts.clone(),
                    created_at: record.created_at,
                })
                .await
        })
        .await;

        if let Some(mut profile) = profile {
            profile.apply_facts(facts);
            let stage = if self.mark_determined_stage {
                record.call_stage
            } else {
                1
            };
            profile.complete_stage(stage);
            TraceEvent::StageCompleted {
                user_id: profile.id.clone(),
                stage,
            }
            .emit();
            self.attempt(&mut outcome, "user_profile", async {
                self.store.upsert_user(profile).await
            })
            .await;
        }

        if !outcome.all_ok() {
            tracing::error!(
                user_id = %record.user_id,
                call_id = %record.id,
                failed = ?outcome.failed_stores(),
                "partial persistence; resubmit the original payload to reprocess"
            );
        }
        outcome
    }

    async fn attempt<F>(&self, outcome: &mut PersistOutcome, store: &'static str, write: F)
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let start = Instant::now();
        let result = write.await.map_err(|e| Error::Persistence {
            store: store.to_owned(),
            message: e.to_string(),
        });
        let duration_ms = start.elapsed().as_millis() as u64;
        TraceEvent::StoreWrite {
            store: store.into(),
            ok: result.is_ok(),
            duration_ms,
        }
        .emit();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "store write failed");
        }
        outcome.attempts.push(WriteAttempt {
            store,
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        });
    }
}

fn vector_row(
    record: &ConversationRecord,
    facts: &ExtractedFacts,
    embeddings: &EmbeddingSet,
) -> VectorRecord {
    let key_topics = [
        facts.entity_type.as_deref(),
        facts.business_type.as_deref(),
        facts.state_of_operation.as_deref(),
        facts.urgency_level.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_owned)
    .collect();

    VectorRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: record.user_id.clone(),
        call_id: record.id.clone(),
        call_session_id: record.call_session_id.clone(),
        call_stage: record.call_stage,
        summary: embeddings.summary_text.clone(),
        key_topics,
        embedding_model: embeddings.model_version.clone(),
        full_transcript_embedding: embeddings.full_transcript.clone(),
        user_turns_embedding: embeddings.user_turns.clone(),
        summary_embedding: embeddings.summary.clone(),
        metadata: serde_json::json!({
            "extraction_method": facts.extraction_method,
            "fields_present": facts.fields_present(),
            "transcript_chars": record.full_transcript.len(),
        }),
        created_at: record.created_at,
    }
}
