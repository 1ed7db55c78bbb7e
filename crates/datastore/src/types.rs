//! Row DTOs for the tables behind the [`crate::DataStore`] trait.
//!
//! Field names are snake_case on the wire, matching the Postgres column
//! names the PostgREST layer exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dg_domain::record::{ConversationRecord, ExtractedFacts};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Vectorized store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One row of the semantic store: summary, key topics, embeddings, and a
/// free-form metadata blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub user_id: String,
    pub call_id: String,
    pub call_session_id: String,
    pub call_stage: u8,
    pub summary: Option<String>,
    #[serde(default)]
    pub key_topics: Vec<String>,
    /// Embedding model version tag for every vector in this row.
    pub embedding_model: String,
    pub full_transcript_embedding: Option<Vec<f32>>,
    pub user_turns_embedding: Option<Vec<f32>>,
    pub summary_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session tracker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-session progress row, upserted by `(user_id, session_id)`.
///
/// Concurrent writers race under last-write-wins; this data is advisory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub user_id: String,
    pub session_id: String,
    pub call_stage: u8,
    pub last_call_id: String,
    pub updated_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Legacy combined record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backward-compatible combined record for legacy readers: transcript plus
/// the extracted fields in one flat row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCallRecord {
    pub id: String,
    pub user_id: String,
    pub call_id: String,
    pub call_stage: u8,
    pub transcript: String,
    #[serde(flatten)]
    pub facts: ExtractedFacts,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A conversation record joined with its stored full-transcript embedding,
/// as consumed by the retrieval ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    pub record: ConversationRecord,
    pub summary: Option<String>,
    /// Model tag of the stored vector; `None` when no vector was generated.
    pub embedding_model: Option<String>,
    pub full_transcript_embedding: Option<Vec<f32>>,
}
