use serde::Serialize;

/// Structured trace events emitted across all DreamGate crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    WebhookNormalized {
        call_id: String,
        shape: String,
        transcript_chars: usize,
        user_turns: usize,
        assistant_turns: usize,
    },
    IdentityResolved {
        identifier_kind: String,
        user_id: String,
        created: bool,
    },
    FactsExtracted {
        call_id: String,
        method: String,
        fields_present: usize,
    },
    EmbeddingGenerated {
        call_id: String,
        vector: String,
        dimensions: usize,
        model_version: String,
    },
    EmbeddingSkipped {
        call_id: String,
        vector: String,
        reason: String,
    },
    StoreWrite {
        store: String,
        ok: bool,
        duration_ms: u64,
    },
    StageCompleted {
        user_id: String,
        stage: u8,
    },
    GapsComputed {
        stage: u8,
        completion_percent: f32,
        priority: String,
    },
    ContextAssembled {
        transcripts: usize,
        knowledge: usize,
        dream_dna_included: bool,
        context_chars: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        purpose: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    DatastoreCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "dg_event");
    }
}
