//! Entity model for the transcript-intelligence pipeline.
//!
//! Everything here is plain data: created by the pipeline, persisted by the
//! datastore crate, and read back by retrieval. Field names are snake_case
//! on the wire (matching the datastore's column names); the HTTP API layer
//! owns its own camelCase DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which side of the call a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One speaker-tagged turn of a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// One ingested call transcript plus derived metadata.
///
/// Immutable and append-only: created on webhook receipt, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    /// Canonical owner. Every record resolves to exactly one user.
    pub user_id: String,
    pub call_session_id: String,
    /// Call stage this conversation belongs to (1-4).
    pub call_stage: u8,
    pub full_transcript: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Concatenated text of the user's turns only.
    pub fn user_text(&self) -> String {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Extracted facts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a set of facts was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Strict-JSON LLM extraction succeeded.
    Llm,
    /// Deterministic regex heuristics (LLM unavailable or unparseable).
    Fallback,
}

/// The fixed business-formation field schema.
///
/// Every field is nullable and serialized even when absent: downstream
/// consumers rely on the full key set being present with explicit `null`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub state_of_operation: Option<String>,
    pub entity_type: Option<String>,
    pub timeline: Option<String>,
    pub urgency_level: Option<String>,
    /// Discriminant for the two-branch extraction strategy.
    pub extraction_method: Option<ExtractionMethod>,
}

impl ExtractedFacts {
    /// Number of non-null business fields (excludes the method tag).
    pub fn fields_present(&self) -> usize {
        [
            &self.customer_name,
            &self.customer_email,
            &self.customer_phone,
            &self.business_name,
            &self.business_type,
            &self.state_of_operation,
            &self.entity_type,
            &self.timeline,
            &self.urgency_level,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    /// An empty result tagged with the method that produced it.
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            extraction_method: Some(method),
            ..Self::default()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Embeddings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Up to three vectors generated per conversation record.
///
/// Sub-failures are independent: a missing summary never blocks the other
/// two vectors. `model_version` tags which embedding model produced the
/// vectors so later similarity comparisons can detect mismatches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingSet {
    pub model_version: String,
    pub full_transcript: Option<Vec<f32>>,
    pub user_turns: Option<Vec<f32>>,
    pub summary: Option<Vec<f32>>,
    /// Summary text persisted alongside its vector.
    pub summary_text: Option<String>,
}

impl EmbeddingSet {
    /// How many of the three vectors were actually generated.
    pub fn vectors_generated(&self) -> usize {
        [&self.full_transcript, &self.user_turns, &self.summary]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// User profile
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A canonical user record.
///
/// Created lazily on first identifiable contact. Stage-completion flags are
/// monotonic: [`UserProfile::complete_stage`] only ever flips them on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub state_of_operation: Option<String>,
    pub entity_type: Option<String>,
    pub timeline: Option<String>,
    pub urgency_level: Option<String>,
    pub stage1_completed: bool,
    pub stage2_completed: bool,
    pub stage3_completed: bool,
    pub stage4_completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Look up a profile field by name, returning it only when present and
    /// non-empty. Used by the gap analyzer's field tables.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "customer_name" => &self.customer_name,
            "customer_email" => &self.customer_email,
            "customer_phone" => &self.customer_phone,
            "business_name" => &self.business_name,
            "business_type" => &self.business_type,
            "state_of_operation" => &self.state_of_operation,
            "entity_type" => &self.entity_type,
            "timeline" => &self.timeline,
            "urgency_level" => &self.urgency_level,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Whether the given stage flag is set.
    pub fn stage_completed(&self, stage: u8) -> bool {
        match stage {
            1 => self.stage1_completed,
            2 => self.stage2_completed,
            3 => self.stage3_completed,
            4 => self.stage4_completed,
            _ => false,
        }
    }

    /// Set a stage-completion flag. Flags cannot be un-set.
    pub fn complete_stage(&mut self, stage: u8) {
        match stage {
            1 => self.stage1_completed = true,
            2 => self.stage2_completed = true,
            3 => self.stage3_completed = true,
            4 => self.stage4_completed = true,
            _ => {}
        }
    }

    /// The first stage without a completion flag, capped at 4.
    pub fn first_incomplete_stage(&self) -> u8 {
        for stage in 1..=4u8 {
            if !self.stage_completed(stage) {
                return stage;
            }
        }
        4
    }

    /// Merge non-null extracted facts into the profile. Incoming values win
    /// (upsert semantics, last-write-wins by design).
    pub fn apply_facts(&mut self, facts: &ExtractedFacts) {
        fn merge(slot: &mut Option<String>, incoming: &Option<String>) {
            if let Some(v) = incoming {
                if !v.trim().is_empty() {
                    *slot = Some(v.clone());
                }
            }
        }
        merge(&mut self.customer_name, &facts.customer_name);
        merge(&mut self.customer_email, &facts.customer_email);
        merge(&mut self.customer_phone, &facts.customer_phone);
        merge(&mut self.business_name, &facts.business_name);
        merge(&mut self.business_type, &facts.business_type);
        merge(&mut self.state_of_operation, &facts.state_of_operation);
        merge(&mut self.entity_type, &facts.entity_type);
        merge(&mut self.timeline, &facts.timeline);
        merge(&mut self.urgency_level, &facts.urgency_level);
        self.updated_at = Some(Utc::now());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent profile ("Dream DNA")
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The user's declared business-vision fields, used for personalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DreamDna {
    pub user_id: String,
    pub core_purpose: Option<String>,
    pub target_audience: Option<String>,
    pub value_proposition: Option<String>,
    pub brand_personality: Option<String>,
    pub revenue_model: Option<String>,
    pub growth_vision: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DreamDna {
    /// Look up an intent-profile field by name (present and non-empty only).
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "core_purpose" => &self.core_purpose,
            "target_audience" => &self.target_audience,
            "value_proposition" => &self.value_proposition,
            "brand_personality" => &self.brand_personality,
            "revenue_model" => &self.revenue_model,
            "growth_vision" => &self.growth_vision,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gap report
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Overall urgency of the gaps found for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPriority {
    /// At least one required field is missing.
    Critical,
    /// All required fields present, at least one important field missing.
    Important,
    /// Only optional fields (or nothing) missing.
    Optional,
}

/// Missing field names per tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissingFields {
    pub required: Vec<String>,
    pub important: Vec<String>,
    pub optional: Vec<String>,
}

/// Per-stage completeness diagnostic over the truth-table field model.
///
/// Derived purely from field presence; computed fresh on every request and
/// never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub stage: u8,
    pub missing: MissingFields,
    pub completed_fields: usize,
    pub total_fields: usize,
    /// Always within `[0, 100]`.
    pub completion_percent: f32,
    pub priority: GapPriority,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Knowledge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A static domain-knowledge entry. Immutable reference data, not
/// user-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub id: String,
    pub category: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_flags_are_monotonic() {
        let mut profile = UserProfile::default();
        profile.complete_stage(2);
        assert!(profile.stage2_completed);
        // There is no API to un-complete; re-completing is a no-op.
        profile.complete_stage(2);
        assert!(profile.stage2_completed);
    }

    #[test]
    fn first_incomplete_stage_walks_forward() {
        let mut profile = UserProfile::default();
        assert_eq!(profile.first_incomplete_stage(), 1);
        profile.complete_stage(1);
        profile.complete_stage(2);
        assert_eq!(profile.first_incomplete_stage(), 3);
    }

    #[test]
    fn apply_facts_keeps_existing_on_null() {
        let mut profile = UserProfile {
            business_name: Some("Acme LLC".into()),
            ..Default::default()
        };
        profile.apply_facts(&ExtractedFacts {
            state_of_operation: Some("Texas".into()),
            ..Default::default()
        });
        assert_eq!(profile.business_name.as_deref(), Some("Acme LLC"));
        assert_eq!(profile.state_of_operation.as_deref(), Some("Texas"));
    }

    #[test]
    fn field_lookup_rejects_blank_values() {
        let profile = UserProfile {
            business_name: Some("   ".into()),
            ..Default::default()
        };
        assert!(profile.field("business_name").is_none());
        assert!(profile.field("no_such_field").is_none());
    }

    #[test]
    fn extracted_facts_serialize_all_keys() {
        let facts = ExtractedFacts::empty(ExtractionMethod::Fallback);
        let json = serde_json::to_value(&facts).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "customer_name",
            "customer_email",
            "customer_phone",
            "business_name",
            "business_type",
            "state_of_operation",
            "entity_type",
            "timeline",
            "urgency_level",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
            assert!(obj[key].is_null());
        }
        assert_eq!(obj["extraction_method"], "fallback");
    }

    #[test]
    fn user_text_filters_assistant_turns() {
        let record = ConversationRecord {
            id: "r1".into(),
            user_id: "u1".into(),
            call_session_id: "s1".into(),
            call_stage: 1,
            full_transcript: String::new(),
            turns: vec![
                Turn {
                    speaker: Speaker::Assistant,
                    text: "Hello!".into(),
                },
                Turn {
                    speaker: Speaker::User,
                    text: "I want an LLC".into(),
                },
            ],
            created_at: Utc::now(),
        };
        assert_eq!(record.user_text(), "I want an LLC");
    }
}
