use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name reported to the OTLP collector.
    #[serde(default = "d_service_name")]
    pub service_name: String,
    /// OTLP/gRPC endpoint. When unset, tracing stays local (JSON to stdout).
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    /// Trace sampling ratio in `[0, 1]`.
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: d_service_name(),
            otlp_endpoint: None,
            sample_rate: 1.0,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_service_name() -> String {
    "dreamgate".into()
}
fn d_sample_rate() -> f64 {
    1.0
}
