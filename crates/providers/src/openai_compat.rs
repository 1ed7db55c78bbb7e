//! OpenAI-compatible adapter.
//!
//! Works with OpenAI and any other endpoint that follows the OpenAI chat
//! completions + embeddings contract (vLLM, Ollama, LM Studio, Together,
//! gateway proxies).

use std::time::Instant;

use serde_json::Value;

use crate::traits::{
    ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, LlmProvider, Usage,
};
use crate::util::{from_reqwest, resolve_api_key};
use dg_domain::config::ProviderConfig;
use dg_domain::error::{Error, Result};
use dg_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    auth_header: String,
    auth_prefix: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig, timeout_ms: u64) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;

        let auth_header = cfg
            .auth
            .header
            .clone()
            .unwrap_or_else(|| "Authorization".into());
        let auth_prefix = cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into());

        let default_model = cfg.default_model.clone().unwrap_or_else(|| "gpt-4o".into());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_header,
            auth_prefix,
            default_model,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let header_value = format!("{}{}", self.auth_prefix, self.api_key);
        self.client
            .post(url)
            .header(&self.auth_header, &header_value)
            .header("Content-Type", "application/json")
    }

    fn build_chat_body(&self, req: &ChatRequest) -> Value {
        let mut messages: Vec<Value> = Vec::new();
        if let Some(ref system) = req.system {
            if !system.is_empty() {
                messages.push(serde_json::json!({
                    "role": "system",
                    "content": system,
                }));
            }
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": req.user,
        }));

        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if req.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(&req);
        let model = body["model"].as_str().unwrap_or_default().to_owned();

        let start = Instant::now();
        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let content = extract_chat_content(&resp_json).ok_or_else(|| Error::Provider {
            provider: self.id.clone(),
            message: "missing choices[0].message.content in chat response".into(),
        })?;
        let usage = extract_usage(&resp_json);

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model: model.clone(),
            purpose: "chat".into(),
            duration_ms: start.elapsed().as_millis() as u64,
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(ChatResponse {
            content,
            usage,
            model: resp_json
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(&model)
                .to_owned(),
        })
    }

    async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let model = req
            .model
            .unwrap_or_else(|| "text-embedding-3-small".into());
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({ "model": model, "input": req.input });

        let start = Instant::now();
        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let data = resp_json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| Error::Provider {
                provider: self.id.clone(),
                message: "missing 'data' array in embeddings response".into(),
            })?;

        let embeddings: Vec<Vec<f32>> = data
            .iter()
            .filter_map(|item| {
                let embedding = item.get("embedding")?.as_array()?;
                Some(
                    embedding
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect(),
                )
            })
            .collect();

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model: model.clone(),
            purpose: "embeddings".into(),
            duration_ms: start.elapsed().as_millis() as u64,
            prompt_tokens: None,
            completion_tokens: None,
        }
        .emit();

        Ok(EmbeddingsResponse { embeddings, model })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn extract_chat_content(resp: &Value) -> Option<String> {
    resp.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_owned)
}

fn extract_usage(resp: &Value) -> Option<Usage> {
    let usage = resp.get("usage")?;
    Some(Usage {
        prompt_tokens: usage.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: usage.get("completion_tokens")?.as_u64()? as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_chat_content_happy_path() {
        let resp = serde_json::json!({
            "choices": [{ "message": { "content": "hello" } }],
        });
        assert_eq!(extract_chat_content(&resp).as_deref(), Some("hello"));
    }

    #[test]
    fn extract_chat_content_missing_choices() {
        let resp = serde_json::json!({ "error": "nope" });
        assert!(extract_chat_content(&resp).is_none());
    }

    #[test]
    fn extract_usage_partial_is_none() {
        let resp = serde_json::json!({ "usage": { "prompt_tokens": 5 } });
        assert!(extract_usage(&resp).is_none());
    }

    #[test]
    fn chat_body_includes_json_mode_and_system() {
        let cfg = ProviderConfig {
            id: "test".into(),
            kind: dg_domain::config::ProviderKind::OpenaiCompat,
            base_url: "http://localhost:1234/v1".into(),
            auth: dg_domain::config::AuthConfig {
                key: Some("sk-test".into()),
                ..Default::default()
            },
            default_model: Some("gpt-4o-mini".into()),
        };
        let provider = OpenAiCompatProvider::from_config(&cfg, 1000).unwrap();
        let body = provider.build_chat_body(&ChatRequest {
            system: Some("You extract facts.".into()),
            user: "hi".into(),
            json_mode: true,
            max_tokens: Some(64),
            ..Default::default()
        });

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 64);
    }
}
