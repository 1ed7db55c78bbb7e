//! Embedding generation for ingested conversations.
//!
//! Produces up to three vectors per record (full transcript, user-only
//! turns, summary) plus the summary text itself. Sub-failures are
//! independent: a failed summary completion or a failed embedding call
//! skips that one vector and continues with the rest.

use std::sync::Arc;

use dg_domain::error::{Error, Result};
use dg_domain::record::{ConversationRecord, EmbeddingSet};
use dg_domain::trace::TraceEvent;
use dg_providers::{ChatRequest, EmbeddingsRequest, LlmProvider};

const SUMMARY_SYSTEM: &str = "You summarize business-formation voice calls. \
Write two to three sentences covering who called, what they want to form, \
and any concrete facts stated (names, states, entity types, timelines).";

pub struct EmbeddingGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    embedding_model: String,
    /// Expected vector dimensionality. A vector of any other size is
    /// rejected before it can reach the store; `0` disables the check.
    embedding_dimensions: usize,
    chat_model: String,
    summary_max_tokens: u32,
}

impl EmbeddingGenerator {
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        embedding_model: impl Into<String>,
        embedding_dimensions: usize,
        chat_model: impl Into<String>,
        summary_max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            embedding_model: embedding_model.into(),
            embedding_dimensions,
            chat_model: chat_model.into(),
            summary_max_tokens,
        }
    }

    /// Generate the embedding set for a record. Total; every failure mode
    /// degrades to a partially-filled (possibly empty) set.
    pub async fn generate(&self, record: &ConversationRecord) -> EmbeddingSet {
        let Some(provider) = self.provider.as_ref() else {
            for vector in ["full_transcript", "user_turns", "summary"] {
                TraceEvent::EmbeddingSkipped {
                    call_id: record.id.clone(),
                    vector: vector.into(),
                    reason: "no provider configured".into(),
                }
                .emit();
            }
            return EmbeddingSet {
                model_version: self.embedding_model.clone(),
                ..Default::default()
            };
        };

        let mut set = EmbeddingSet {
            model_version: self.embedding_model.clone(),
            ..Default::default()
        };

        set.full_transcript = self
            .embed_one(provider, &record.id, "full_transcript", &record.full_transcript)
            .await;

        let user_text = record.user_text();
        if user_text.trim().is_empty() {
            TraceEvent::EmbeddingSkipped {
                call_id: record.id.clone(),
                vector: "user_turns".into(),
                reason: "no user turns".into(),
            }
            .emit();
        } else {
            set.user_turns = self
                .embed_one(provider, &record.id, "user_turns", &user_text)
                .await;
        }

        // The summary vector depends on a summary completion; failure here
        // never touches the two vectors above.
        match self.summarize(provider, &record.full_transcript).await {
            Some(summary) => {
                set.summary = self
                    .embed_one(provider, &record.id, "summary", &summary)
                    .await;
                set.summary_text = Some(summary);
            }
            None => {
                TraceEvent::EmbeddingSkipped {
                    call_id: record.id.clone(),
                    vector: "summary".into(),
                    reason: "summary generation failed".into(),
                }
                .emit();
            }
        }

        set
    }

    async fn embed_one(
        &self,
        provider: &Arc<dyn LlmProvider>,
        call_id: &str,
        vector: &str,
        text: &str,
    ) -> Option<Vec<f32>> {
        match self.try_embed(provider, call_id, vector, text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                TraceEvent::EmbeddingSkipped {
                    call_id: call_id.to_owned(),
                    vector: vector.to_owned(),
                    reason: e.to_string(),
                }
                .emit();
                None
            }
        }
    }

    async fn try_embed(
        &self,
        provider: &Arc<dyn LlmProvider>,
        call_id: &str,
        vector: &str,
        text: &str,
    ) -> Result<Vec<f32>> {
        let mut response = provider
            .embeddings(EmbeddingsRequest {
                input: vec![text.to_owned()],
                model: Some(self.embedding_model.clone()),
            })
            .await
            .map_err(|e| Error::Embedding {
                vector: vector.to_owned(),
                message: e.to_string(),
            })?;
        if response.embeddings.is_empty() {
            return Err(Error::Embedding {
                vector: vector.to_owned(),
                message: "provider returned no vectors".into(),
            });
        }
        let embedding = response.embeddings.remove(0);
        if self.embedding_dimensions != 0 && embedding.len() != self.embedding_dimensions {
            return Err(Error::Embedding {
                vector: vector.to_owned(),
                message: format!(
                    "expected {} dimensions, got {}",
                    self.embedding_dimensions,
                    embedding.len()
                ),
            });
        }
        TraceEvent::EmbeddingGenerated {
            call_id: call_id.to_owned(),
            vector: vector.to_owned(),
            dimensions: embedding.len(),
            model_version: response.model,
        }
        .emit();
        Ok(embedding)
    }

    async fn summarize(&self, provider: &Arc<dyn LlmProvider>, transcript: &str) -> Option<String> {
        let result = provider
            .chat(ChatRequest {
                system: Some(SUMMARY_SYSTEM.to_owned()),
                user: transcript.to_owned(),
                temperature: Some(0.2),
                max_tokens: Some(self.summary_max_tokens),
                json_mode: false,
                model: Some(self.chat_model.clone()),
            })
            .await;
        match result {
            Ok(response) => {
                let summary = response.content.trim().to_owned();
                (!summary.is_empty()).then_some(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dg_domain::record::{Speaker, Turn};
    use dg_providers::{ChatResponse, EmbeddingsResponse};

    /// Returns fixed-size vectors and a canned summary.
    struct FixedDims(usize);

    #[async_trait::async_trait]
    impl LlmProvider for FixedDims {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                content: "A caller asked about forming an LLC.".into(),
                usage: None,
                model: "test".into(),
            })
        }

        async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
            Ok(EmbeddingsResponse {
                embeddings: req.input.iter().map(|_| vec![0.5; self.0]).collect(),
                model: "test".into(),
            })
        }

        fn provider_id(&self) -> &str {
            "test"
        }
    }

    fn record() -> ConversationRecord {
        ConversationRecord {
            id: "c1".into(),
            user_id: "u1".into(),
            call_session_id: "s1".into(),
            call_stage: 1,
            full_transcript: "User: hello".into(),
            turns: vec![Turn {
                speaker: Speaker::User,
                text: "hello".into(),
            }],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn no_provider_yields_empty_tagged_set() {
        let generator =
            EmbeddingGenerator::new(None, "text-embedding-3-small", 1536, "gpt-4o", 200);
        let set = generator.generate(&record()).await;
        assert_eq!(set.vectors_generated(), 0);
        assert_eq!(set.model_version, "text-embedding-3-small");
        assert!(set.summary_text.is_none());
    }

    #[tokio::test]
    async fn matching_dimensions_generate_all_vectors() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedDims(4));
        let generator = EmbeddingGenerator::new(Some(provider), "m", 4, "gpt-4o", 200);
        let set = generator.generate(&record()).await;
        assert_eq!(set.vectors_generated(), 3);
    }

    #[tokio::test]
    async fn wrong_dimension_vectors_are_skipped() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedDims(8));
        let generator = EmbeddingGenerator::new(Some(provider), "m", 4, "gpt-4o", 200);
        let set = generator.generate(&record()).await;
        assert_eq!(set.vectors_generated(), 0);
        // The summary completion itself succeeded; only its vector is gone.
        assert!(set.summary_text.is_some());
    }

    #[tokio::test]
    async fn zero_dimensions_disables_the_check() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedDims(8));
        let generator = EmbeddingGenerator::new(Some(provider), "m", 0, "gpt-4o", 200);
        let set = generator.generate(&record()).await;
        assert_eq!(set.vectors_generated(), 3);
    }
}
