use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval / RAG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Most-recent conversation records fetched per user before ranking.
    #[serde(default = "d_5")]
    pub transcript_candidates: usize,
    /// Ranked transcripts kept in the grounding context.
    #[serde(default = "d_3")]
    pub transcript_top_k: usize,
    /// Knowledge snippets kept after keyword filtering.
    #[serde(default = "d_3")]
    pub knowledge_top_k: usize,
    /// Token budget for the synthesized answer.
    #[serde(default = "d_900")]
    pub answer_max_tokens: u32,
    /// Sampling temperature for the synthesized answer.
    #[serde(default = "d_temp")]
    pub answer_temperature: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            transcript_candidates: 5,
            transcript_top_k: 3,
            knowledge_top_k: 3,
            answer_max_tokens: 900,
            answer_temperature: 0.6,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_5() -> usize {
    5
}
fn d_3() -> usize {
    3
}
fn d_900() -> u32 {
    900
}
fn d_temp() -> f32 {
    0.6
}
