use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ingestion pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Create a minimal user profile on first identifiable contact.
    #[serde(default = "d_true")]
    pub create_missing_users: bool,
    /// Token budget for the transcript summary completion.
    #[serde(default = "d_200")]
    pub summary_max_tokens: u32,
    /// Environment variable holding the webhook HMAC secret. When the env
    /// var is unset or empty, signature verification is disabled.
    #[serde(default = "d_webhook_secret_env")]
    pub webhook_secret_env: String,
    /// How long a processed call ID is remembered for idempotent replays.
    #[serde(default = "d_dedupe_ttl")]
    pub dedupe_ttl_secs: u64,
    /// Mark the stage actually determined for the call (default). Set to
    /// `false` to reproduce the legacy behavior of always marking stage 1.
    #[serde(default = "d_true")]
    pub mark_determined_stage: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            create_missing_users: true,
            summary_max_tokens: 200,
            webhook_secret_env: d_webhook_secret_env(),
            dedupe_ttl_secs: d_dedupe_ttl(),
            mark_determined_stage: true,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_200() -> u32 {
    200
}
fn d_webhook_secret_env() -> String {
    "DG_WEBHOOK_SECRET".into()
}
fn d_dedupe_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_defaults() {
        let cfg = PipelineConfig::default();
        assert!(cfg.create_missing_users);
        assert!(cfg.mark_determined_stage);
        assert_eq!(cfg.dedupe_ttl_secs, 3600);
    }
}
