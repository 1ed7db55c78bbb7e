//! In-process implementation of [`DataStore`].
//!
//! Backs `datastore.mode = "memory"` and every pipeline/retrieval test.
//! All tables live in `parking_lot::RwLock`-guarded maps; nothing survives
//! a restart. Tests can inject per-operation failures to exercise the
//! partial-failure paths of the persistence coordinator.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use dg_domain::error::{Error, Result};
use dg_domain::record::{ConversationRecord, DreamDna, KnowledgeSnippet, UserProfile};

use crate::store::DataStore;
use crate::types::{LegacyCallRecord, SessionProgress, StoredConversation, VectorRecord};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An in-process `DataStore`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserProfile>>,
    conversations: RwLock<Vec<ConversationRecord>>,
    vectors: RwLock<Vec<VectorRecord>>,
    sessions: RwLock<HashMap<(String, String), SessionProgress>>,
    legacy: RwLock<Vec<LegacyCallRecord>>,
    knowledge: RwLock<Vec<KnowledgeSnippet>>,
    dream_dna: RwLock<HashMap<String, DreamDna>>,
    /// Operation names that should fail on the next call (test hook).
    failing_ops: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with the built-in business-formation knowledge
    /// set, matching what the hosted store ships in `knowledge_snippets`.
    pub fn with_default_knowledge() -> Self {
        let store = Self::new();
        store.seed_knowledge(default_knowledge());
        store
    }

    /// Replace the knowledge table.
    pub fn seed_knowledge(&self, snippets: Vec<KnowledgeSnippet>) {
        *self.knowledge.write() = snippets;
    }

    /// Seed an intent profile.
    pub fn seed_dream_dna(&self, dna: DreamDna) {
        self.dream_dna.write().insert(dna.user_id.clone(), dna);
    }

    /// Make the named operation fail with `Error::Datastore` until cleared.
    /// Operation names match the trait method names
    /// (e.g. `"insert_legacy_record"`).
    pub fn fail_op(&self, op: &str) {
        self.failing_ops.write().insert(op.to_owned());
    }

    /// Clear an injected failure.
    pub fn clear_failure(&self, op: &str) {
        self.failing_ops.write().remove(op);
    }

    /// Direct row-count accessors for test assertions.
    pub fn conversation_count(&self) -> usize {
        self.conversations.read().len()
    }
    pub fn vector_count(&self) -> usize {
        self.vectors.read().len()
    }
    pub fn legacy_count(&self) -> usize {
        self.legacy.read().len()
    }
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.failing_ops.read().contains(op) {
            return Err(Error::Datastore(format!("injected failure: {op}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserProfile>> {
        self.check("find_user_by_phone")?;
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.customer_phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        self.check("find_user_by_email")?;
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.customer_email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        self.check("get_user")?;
        Ok(self.users.read().get(id).cloned())
    }

    async fn create_user(&self, profile: UserProfile) -> Result<UserProfile> {
        self.check("create_user")?;
        self.users
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<()> {
        self.check("upsert_user")?;
        self.users.write().insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn insert_conversation(&self, record: ConversationRecord) -> Result<()> {
        self.check("insert_conversation")?;
        self.conversations.write().push(record);
        Ok(())
    }

    async fn insert_vector_record(&self, row: VectorRecord) -> Result<()> {
        self.check("insert_vector_record")?;
        self.vectors.write().push(row);
        Ok(())
    }

    async fn upsert_session_progress(&self, row: SessionProgress) -> Result<()> {
        self.check("upsert_session_progress")?;
        self.sessions
            .write()
            .insert((row.user_id.clone(), row.session_id.clone()), row);
        Ok(())
    }

    async fn insert_legacy_record(&self, row: LegacyCallRecord) -> Result<()> {
        self.check("insert_legacy_record")?;
        self.legacy.write().push(row);
        Ok(())
    }

    async fn recent_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredConversation>> {
        self.check("recent_conversations")?;
        let vectors = self.vectors.read();
        let mut records: Vec<ConversationRecord> = self
            .conversations
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);

        Ok(records
            .into_iter()
            .map(|record| {
                let vector = vectors.iter().find(|v| v.call_id == record.id);
                StoredConversation {
                    summary: vector.and_then(|v| v.summary.clone()),
                    embedding_model: vector.map(|v| v.embedding_model.clone()),
                    full_transcript_embedding: vector
                        .and_then(|v| v.full_transcript_embedding.clone()),
                    record,
                }
            })
            .collect())
    }

    async fn list_knowledge(&self) -> Result<Vec<KnowledgeSnippet>> {
        self.check("list_knowledge")?;
        Ok(self.knowledge.read().clone())
    }

    async fn get_dream_dna(&self, user_id: &str) -> Result<Option<DreamDna>> {
        self.check("get_dream_dna")?;
        Ok(self.dream_dna.read().get(user_id).cloned())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "status": "ok",
            "mode": "memory",
            "users": self.users.read().len(),
            "conversations": self.conversations.read().len(),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Built-in knowledge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn snippet(id: &str, category: &str, content: &str) -> KnowledgeSnippet {
    KnowledgeSnippet {
        id: id.into(),
        category: category.into(),
        content: content.into(),
    }
}

/// The static business-formation knowledge set used in memory mode.
pub fn default_knowledge() -> Vec<KnowledgeSnippet> {
    vec![
        snippet(
            "k-entity-llc",
            "entity_types",
            "An LLC (limited liability company) combines liability protection \
             with pass-through taxation and minimal formalities; the most \
             common choice for small businesses.",
        ),
        snippet(
            "k-entity-corp",
            "entity_types",
            "A corporation (C-corp or S-corp) suits businesses seeking outside \
             investment; it requires bylaws, a board, and annual filings.",
        ),
        snippet(
            "k-state-filing",
            "state_filing",
            "Formation is filed with the state's Secretary of State; filing \
             fees and processing times vary by state, and some states require \
             a registered agent with an in-state address.",
        ),
        snippet(
            "k-ein",
            "tax",
            "An EIN (employer identification number) from the IRS is needed to \
             open a business bank account and hire employees; applying online \
             is free.",
        ),
        snippet(
            "k-naming",
            "naming",
            "The business name must be distinguishable from existing entities \
             in the formation state; a name search and optional reservation \
             happen before filing.",
        ),
        snippet(
            "k-timeline",
            "timeline",
            "Standard state processing takes one to four weeks; most states \
             offer paid expedited filing measured in days.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, user: &str) -> ConversationRecord {
        ConversationRecord {
            id: id.into(),
            user_id: user.into(),
            call_session_id: format!("s-{id}"),
            call_stage: 1,
            full_transcript: "hello".into(),
            turns: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn injected_failure_only_hits_named_op() {
        let store = MemoryStore::new();
        store.fail_op("insert_legacy_record");

        store.insert_conversation(record("c1", "u1")).await.unwrap();
        let err = store
            .insert_legacy_record(LegacyCallRecord {
                id: "l1".into(),
                user_id: "u1".into(),
                call_id: "c1".into(),
                call_stage: 1,
                transcript: String::new(),
                facts: Default::default(),
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("injected failure"));

        store.clear_failure("insert_legacy_record");
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn recent_conversations_newest_first_and_limited() {
        let store = MemoryStore::new();
        for i in 0..7 {
            let mut r = record(&format!("c{i}"), "u1");
            r.created_at = Utc::now() + chrono::Duration::seconds(i);
            store.insert_conversation(r).await.unwrap();
        }
        let recent = store.recent_conversations("u1", 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].record.id, "c6");
        assert!(recent.iter().all(|c| c.full_transcript_embedding.is_none()));
    }

    #[tokio::test]
    async fn session_progress_upsert_overwrites_by_key() {
        let store = MemoryStore::new();
        let mut row = SessionProgress {
            user_id: "u1".into(),
            session_id: "s1".into(),
            call_stage: 1,
            last_call_id: "c1".into(),
            updated_at: Utc::now(),
        };
        store.upsert_session_progress(row.clone()).await.unwrap();
        row.call_stage = 2;
        row.last_call_id = "c2".into();
        store.upsert_session_progress(row).await.unwrap();
        assert_eq!(store.session_count(), 1);
    }
}
