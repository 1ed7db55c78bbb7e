//! The `DataStore` trait defines the interface for all storage backends
//! (REST, in-memory/test).

use async_trait::async_trait;

use dg_domain::error::Result;
use dg_domain::record::{ConversationRecord, DreamDna, KnowledgeSnippet, UserProfile};

use crate::types::{LegacyCallRecord, SessionProgress, StoredConversation, VectorRecord};

/// Abstraction over the relational + vector store.
///
/// Implementations may talk to the hosted PostgREST API or keep everything
/// in process. All methods return `dg_domain::error::Result`; callers own
/// the degrade-and-continue policy (the store itself never swallows
/// failures).
#[async_trait]
pub trait DataStore: Send + Sync {
    // ── Users / identity ─────────────────────────────────────────────

    /// Look up a user by exact phone match.
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserProfile>>;

    /// Look up a user by exact email match.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>>;

    /// Fetch a user by canonical id.
    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>>;

    /// Insert a new user profile, returning the stored row.
    async fn create_user(&self, profile: UserProfile) -> Result<UserProfile>;

    /// Upsert a user profile by id (last-write-wins).
    async fn upsert_user(&self, profile: UserProfile) -> Result<()>;

    // ── Persistence fan-out targets ──────────────────────────────────

    /// Append to the immutable raw-transcript archive.
    async fn insert_conversation(&self, record: ConversationRecord) -> Result<()>;

    /// Insert into the vectorized/semantic store.
    async fn insert_vector_record(&self, row: VectorRecord) -> Result<()>;

    /// Upsert the session tracker row keyed `(user_id, session_id)`.
    async fn upsert_session_progress(&self, row: SessionProgress) -> Result<()>;

    /// Insert the backward-compatible combined record.
    async fn insert_legacy_record(&self, row: LegacyCallRecord) -> Result<()>;

    // ── Retrieval ────────────────────────────────────────────────────

    /// Most-recent conversations for a user (newest first), joined with
    /// their stored full-transcript embeddings.
    async fn recent_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredConversation>>;

    /// The static domain-knowledge set.
    async fn list_knowledge(&self) -> Result<Vec<KnowledgeSnippet>>;

    /// The user's intent profile, when one exists.
    async fn get_dream_dna(&self, user_id: &str) -> Result<Option<DreamDna>>;

    // ── Health ───────────────────────────────────────────────────────

    /// Reachability probe used by `/v1/health`.
    async fn health(&self) -> Result<serde_json::Value>;
}
