use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Datastore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Which implementation backs the `DataStore` trait.
    #[serde(default)]
    pub mode: DatastoreMode,
    /// Base URL of the PostgREST-style API (e.g. `https://xyz.supabase.co`).
    #[serde(default)]
    pub base_url: String,
    /// Environment variable holding the service API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_10000u")]
    pub timeout_ms: u64,
    /// Retries for transient (5xx / timeout) failures. 4xx is permanent.
    #[serde(default = "d_2")]
    pub max_retries: u32,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            mode: DatastoreMode::default(),
            base_url: String::new(),
            api_key_env: d_api_key_env(),
            timeout_ms: 10_000,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreMode {
    /// REST client against the hosted relational + vector store.
    Rest,
    /// In-process store. Data does not survive a restart; dev and tests.
    #[default]
    Memory,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_key_env() -> String {
    "DG_DATASTORE_KEY".into()
}
fn d_10000u() -> u64 {
    10_000
}
fn d_2() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datastore_defaults_to_memory_mode() {
        let cfg = DatastoreConfig::default();
        assert_eq!(cfg.mode, DatastoreMode::Memory);
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn datastore_rest_mode_parses() {
        let toml_str = r#"
            mode = "rest"
            base_url = "https://example.supabase.co"
        "#;
        let cfg: DatastoreConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.mode, DatastoreMode::Rest);
        assert_eq!(cfg.base_url, "https://example.supabase.co");
    }
}
