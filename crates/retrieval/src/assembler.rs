//! Retrieval context assembly (the RAG front half).
//!
//! Given a free-text query and a user identifier, gathers four grounding
//! sources: similar past transcripts, relevant static knowledge, the
//! user's intent profile, and the truth-table gap report. Each source is
//! independently optional; assembly always succeeds even when every
//! source comes back empty.

use std::sync::Arc;

use dg_datastore::{DataStore, StoredConversation};
use dg_domain::config::RetrievalConfig;
use dg_domain::record::{DreamDna, GapReport, KnowledgeSnippet, UserProfile};
use dg_domain::trace::TraceEvent;
use dg_providers::{EmbeddingsRequest, LlmProvider};

use crate::{gaps, knowledge, similarity};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What to retrieve for one query.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub message: String,
    pub user_id: String,
    /// Intent-profile key when it differs from the user id.
    pub dream_id: Option<String>,
    pub call_stage: u8,
    pub include_transcripts: bool,
    pub include_knowledge: bool,
    pub include_dream_dna: bool,
}

/// One retrieved past conversation.
#[derive(Debug, Clone)]
pub struct RetrievedTranscript {
    pub call_id: String,
    pub summary: Option<String>,
    pub excerpt: String,
    /// Cosine score against the query; `None` when ranked by recency.
    pub score: Option<f32>,
}

/// The assembled grounding context.
#[derive(Debug, Clone)]
pub struct GroundingContext {
    pub transcripts: Vec<RetrievedTranscript>,
    pub knowledge: Vec<KnowledgeSnippet>,
    pub dream_dna: Option<DreamDna>,
    pub gaps: GapReport,
    pub profile: Option<UserProfile>,
}

/// Counters surfaced to the API caller alongside the answer.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyReport {
    pub retrieved_transcripts: usize,
    pub retrieved_knowledge: usize,
    pub dream_dna_included: bool,
}

const EXCERPT_CHARS: usize = 400;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assembler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ContextAssembler {
    store: Arc<dyn DataStore>,
    provider: Option<Arc<dyn LlmProvider>>,
    embedding_model: String,
    config: RetrievalConfig,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<dyn DataStore>,
        provider: Option<Arc<dyn LlmProvider>>,
        embedding_model: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            provider,
            embedding_model: embedding_model.into(),
            config,
        }
    }

    /// Assemble the grounding context for one query. Total: source
    /// failures log and degrade to empty sections.
    pub async fn assemble(&self, req: &AssemblyRequest) -> (GroundingContext, AssemblyReport) {
        let profile = self.load_profile(&req.user_id).await;

        let transcripts = if req.include_transcripts {
            self.retrieve_transcripts(&req.message, &req.user_id).await
        } else {
            Vec::new()
        };

        let knowledge = if req.include_knowledge {
            match self.store.list_knowledge().await {
                Ok(snippets) => knowledge::select(&req.message, &snippets, self.config.knowledge_top_k)
                    .into_iter()
                    .cloned()
                    .collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "knowledge lookup failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let dream_dna = if req.include_dream_dna {
            let key = req.dream_id.as_deref().unwrap_or(&req.user_id);
            match self.store.get_dream_dna(key).await {
                Ok(dna) => dna,
                Err(e) => {
                    tracing::warn!(error = %e, "intent profile lookup failed");
                    None
                }
            }
        } else {
            None
        };

        let gaps = gaps::analyze(
            req.call_stage,
            profile.as_ref().unwrap_or(&UserProfile::default()),
            dream_dna.as_ref(),
        );

        let context = GroundingContext {
            transcripts,
            knowledge,
            dream_dna,
            gaps,
            profile,
        };
        let report = AssemblyReport {
            retrieved_transcripts: context.transcripts.len(),
            retrieved_knowledge: context.knowledge.len(),
            dream_dna_included: context.dream_dna.is_some(),
        };
        TraceEvent::ContextAssembled {
            transcripts: report.retrieved_transcripts,
            knowledge: report.retrieved_knowledge,
            dream_dna_included: report.dream_dna_included,
            context_chars: context.render().len(),
        }
        .emit();
        (context, report)
    }

    async fn load_profile(&self, user_id: &str) -> Option<UserProfile> {
        // The id may be a canonical id or a raw email/phone from an
        // earlier degraded resolution.
        let by_id = self.store.get_user(user_id).await.ok().flatten();
        if by_id.is_some() {
            return by_id;
        }
        if user_id.contains('@') {
            self.store.find_user_by_email(user_id).await.ok().flatten()
        } else {
            self.store.find_user_by_phone(user_id).await.ok().flatten()
        }
    }

    async fn retrieve_transcripts(&self, message: &str, user_id: &str) -> Vec<RetrievedTranscript> {
        let candidates = match self
            .store
            .recent_conversations(user_id, self.config.transcript_candidates)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "transcript retrieval failed");
                return Vec::new();
            }
        };

        let query_embedding = self.embed_query(message).await;
        rank(candidates, query_embedding.as_deref(), &self.embedding_model)
            .into_iter()
            .take(self.config.transcript_top_k)
            .collect()
    }

    async fn embed_query(&self, message: &str) -> Option<Vec<f32>> {
        let provider = self.provider.as_ref()?;
        let result = provider
            .embeddings(EmbeddingsRequest {
                input: vec![message.to_owned()],
                model: Some(self.embedding_model.clone()),
            })
            .await;
        match result {
            Ok(mut response) if !response.embeddings.is_empty() => {
                Some(response.embeddings.remove(0))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; ranking by recency");
                None
            }
        }
    }
}

/// Rank candidates by cosine similarity where a comparable stored vector
/// exists (same model version), then recency for the rest.
fn rank(
    candidates: Vec<StoredConversation>,
    query_embedding: Option<&[f32]>,
    model: &str,
) -> Vec<RetrievedTranscript> {
    let mut scored: Vec<(Option<f32>, RetrievedTranscript)> = candidates
        .into_iter()
        .map(|c| {
            let score = match (query_embedding, &c.full_transcript_embedding) {
                (Some(q), Some(v)) if c.embedding_model.as_deref() == Some(model) => {
                    Some(similarity::cosine(q, v))
                }
                _ => None,
            };
            let excerpt: String = c.record.full_transcript.chars().take(EXCERPT_CHARS).collect();
            (
                score,
                RetrievedTranscript {
                    call_id: c.record.id,
                    summary: c.summary,
                    excerpt,
                    score,
                },
            )
        })
        .collect();

    // Scored candidates first, highest cosine on top; unscored keep their
    // recency order behind them.
    scored.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    scored.into_iter().map(|(_, t)| t).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl GroundingContext {
    /// Render all sections into one labeled grounding block for the
    /// synthesizer prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.transcripts.is_empty() {
            out.push_str("## Past conversations\n");
            for t in &self.transcripts {
                match &t.summary {
                    Some(summary) => out.push_str(&format!("- [{}] {}\n", t.call_id, summary)),
                    None => out.push_str(&format!("- [{}] {}\n", t.call_id, t.excerpt)),
                }
            }
            out.push('\n');
        }

        if !self.knowledge.is_empty() {
            out.push_str("## Reference knowledge\n");
            for k in &self.knowledge {
                out.push_str(&format!("- ({}) {}\n", k.category, k.content));
            }
            out.push('\n');
        }

        if let Some(dna) = &self.dream_dna {
            out.push_str("## Business vision\n");
            for (label, value) in [
                ("Core purpose", &dna.core_purpose),
                ("Target audience", &dna.target_audience),
                ("Value proposition", &dna.value_proposition),
                ("Brand personality", &dna.brand_personality),
                ("Revenue model", &dna.revenue_model),
                ("Growth vision", &dna.growth_vision),
            ] {
                if let Some(v) = value {
                    out.push_str(&format!("- {label}: {v}\n"));
                }
            }
            out.push('\n');
        }

        if let Some(profile) = &self.profile {
            out.push_str("## Known profile fields\n");
            for name in [
                "customer_name",
                "business_name",
                "business_type",
                "state_of_operation",
                "entity_type",
                "timeline",
                "urgency_level",
            ] {
                if let Some(v) = profile.field(name) {
                    out.push_str(&format!("- {name}: {v}\n"));
                }
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "## Information gaps (stage {}, {:.0}% complete, priority {:?})\n",
            self.gaps.stage, self.gaps.completion_percent, self.gaps.priority
        ));
        for (tier, fields) in [
            ("required", &self.gaps.missing.required),
            ("important", &self.gaps.missing.important),
            ("optional", &self.gaps.missing.optional),
        ] {
            if !fields.is_empty() {
                out.push_str(&format!("- missing {tier}: {}\n", fields.join(", ")));
            }
        }
        out
    }
}
