use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Registered LLM providers. The first provider that initializes is
    /// used; the pipeline degrades (fallback extraction, skipped vectors,
    /// apology responses) when the list is empty.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Model used for fact extraction, summaries, and grounded answers.
    #[serde(default = "d_chat_model")]
    pub chat_model: String,
    /// Embedding model. The version tag stored with every vector.
    #[serde(default = "d_embedding_model")]
    pub embedding_model: String,
    /// Fixed dimensionality of generated vectors.
    #[serde(default = "d_1536")]
    pub embedding_dimensions: usize,
    #[serde(default = "d_20000u")]
    pub default_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            chat_model: d_chat_model(),
            embedding_model: d_embedding_model(),
            embedding_dimensions: 1536,
            default_timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any endpoint following the OpenAI chat-completions + embeddings
    /// contract (OpenAI, Azure-compatible proxies, vLLM, Ollama, ...).
    OpenaiCompat,
}

/// How to obtain the provider's API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Plaintext key in the config file. Works, but logs a warning;
    /// prefer `env`.
    #[serde(default)]
    pub key: Option<String>,
    /// Environment variable holding the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Header name override (default `Authorization`).
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix override (default `"Bearer "`).
    #[serde(default)]
    pub prefix: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_chat_model() -> String {
    "gpt-4o".into()
}
fn d_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn d_1536() -> usize {
    1536
}
fn d_20000u() -> u64 {
    20_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_config_defaults() {
        let cfg = LlmConfig::default();
        assert!(cfg.providers.is_empty());
        assert_eq!(cfg.embedding_model, "text-embedding-3-small");
        assert_eq!(cfg.embedding_dimensions, 1536);
    }

    #[test]
    fn provider_config_parses_from_toml() {
        let toml_str = r#"
            id = "openai"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"

            [auth]
            env = "OPENAI_API_KEY"
        "#;
        let cfg: ProviderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.kind, ProviderKind::OpenaiCompat);
        assert_eq!(cfg.auth.env.as_deref(), Some("OPENAI_API_KEY"));
    }
}
