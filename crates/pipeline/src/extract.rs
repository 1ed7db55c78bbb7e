//! LLM-backed structured fact extraction.
//!
//! Primary path submits a fixed system+user prompt pair requesting strict
//! JSON over the fact schema. Any failure along the way (no provider,
//! transport error, unparseable output) degrades to the regex fallback in
//! [`crate::fallback`]. Never returns an error to the caller.

use std::sync::Arc;

use serde::Deserialize;

use dg_domain::error::Error;
use dg_domain::record::{ExtractedFacts, ExtractionMethod};
use dg_domain::trace::TraceEvent;
use dg_providers::{ChatRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "You extract structured business-formation facts from \
voice-call transcripts. Respond with a single JSON object and nothing else. \
Use null for any field not stated in the transcript. Schema: \
{\"customer_name\": string|null, \"customer_email\": string|null, \
\"customer_phone\": string|null, \"business_name\": string|null, \
\"business_type\": string|null, \"state_of_operation\": string|null, \
\"entity_type\": string|null, \"timeline\": string|null, \
\"urgency_level\": \"high\"|\"medium\"|\"low\"|null}";

/// LLM response schema. Mirrors [`ExtractedFacts`] minus the method tag,
/// which the extractor stamps itself.
#[derive(Debug, Default, Deserialize)]
struct LlmFacts {
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    business_name: Option<String>,
    business_type: Option<String>,
    state_of_operation: Option<String>,
    entity_type: Option<String>,
    timeline: Option<String>,
    urgency_level: Option<String>,
}

pub struct FactExtractor {
    provider: Option<Arc<dyn LlmProvider>>,
    chat_model: String,
}

impl FactExtractor {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, chat_model: impl Into<String>) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
        }
    }

    /// Extract facts from a transcript. Total; the result is always
    /// schema-complete and tagged with the method that produced it.
    pub async fn extract(&self, call_id: &str, user_text: &str) -> ExtractedFacts {
        let facts = match self.try_llm(user_text).await {
            Some(facts) => facts,
            None => crate::fallback::extract(user_text),
        };
        TraceEvent::FactsExtracted {
            call_id: call_id.to_owned(),
            method: match facts.extraction_method {
                Some(ExtractionMethod::Llm) => "llm".into(),
                _ => "fallback".into(),
            },
            fields_present: facts.fields_present(),
        }
        .emit();
        facts
    }

    async fn try_llm(&self, user_text: &str) -> Option<ExtractedFacts> {
        let provider = self.provider.as_ref()?;
        let response = provider
            .chat(ChatRequest {
                system: Some(SYSTEM_PROMPT.to_owned()),
                user: format!("Transcript (user turns only):\n{user_text}"),
                temperature: Some(0.0),
                max_tokens: Some(400),
                json_mode: true,
                model: Some(self.chat_model.clone()),
            })
            .await;
        let content = match response {
            Ok(r) => r.content,
            Err(e) => {
                let e = Error::Extraction(e.to_string());
                tracing::warn!(error = %e, "using fallback");
                return None;
            }
        };

        match parse_strict_json(&content) {
            Some(parsed) => Some(into_facts(parsed)),
            None => {
                let e = Error::Extraction("model output was not valid JSON".into());
                tracing::warn!(error = %e, "using fallback");
                None
            }
        }
    }
}

fn into_facts(parsed: LlmFacts) -> ExtractedFacts {
    fn clean(v: Option<String>) -> Option<String> {
        v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
    }
    ExtractedFacts {
        customer_name: clean(parsed.customer_name),
        customer_email: clean(parsed.customer_email),
        customer_phone: clean(parsed.customer_phone),
        business_name: clean(parsed.business_name),
        business_type: clean(parsed.business_type),
        state_of_operation: clean(parsed.state_of_operation),
        entity_type: clean(parsed.entity_type),
        timeline: clean(parsed.timeline),
        urgency_level: clean(parsed.urgency_level),
        extraction_method: Some(ExtractionMethod::Llm),
    }
}

/// Strip markdown code-fence wrappers and parse the remainder as JSON.
fn parse_strict_json(content: &str) -> Option<LlmFacts> {
    let trimmed = strip_fences(content);
    serde_json::from_str(trimmed).ok()
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let content = "```json\n{\"customer_name\": \"Jane\"}\n```";
        let facts = parse_strict_json(content).unwrap();
        assert_eq!(facts.customer_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn bare_json_parses() {
        let facts = parse_strict_json("{\"entity_type\": \"LLC\"}").unwrap();
        assert_eq!(facts.entity_type.as_deref(), Some("LLC"));
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_strict_json("Sure! Here are the facts:").is_none());
    }

    /// A provider whose chat output is prose, not the requested JSON.
    struct ChattyProvider;

    #[async_trait::async_trait]
    impl LlmProvider for ChattyProvider {
        async fn chat(
            &self,
            _req: ChatRequest,
        ) -> dg_domain::error::Result<dg_providers::ChatResponse> {
            Ok(dg_providers::ChatResponse {
                content: "Sure! Here are the facts I found in the call:".into(),
                usage: None,
                model: "test".into(),
            })
        }

        async fn embeddings(
            &self,
            _req: dg_providers::EmbeddingsRequest,
        ) -> dg_domain::error::Result<dg_providers::EmbeddingsResponse> {
            Ok(dg_providers::EmbeddingsResponse {
                embeddings: vec![],
                model: "test".into(),
            })
        }

        fn provider_id(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn unparseable_llm_output_degrades_to_fallback() {
        let extractor = FactExtractor::new(Some(Arc::new(ChattyProvider)), "gpt-4o");
        let facts = extractor
            .extract("c1", "My name is Jane Doe and I want an LLC in Texas")
            .await;
        assert_eq!(facts.extraction_method, Some(ExtractionMethod::Fallback));
        assert_eq!(facts.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(facts.entity_type.as_deref(), Some("LLC"));
        assert_eq!(facts.state_of_operation.as_deref(), Some("Texas"));
    }

    #[tokio::test]
    async fn no_provider_degrades_to_fallback() {
        let extractor = FactExtractor::new(None, "gpt-4o");
        let facts = extractor
            .extract("c1", "My name is Jane Doe and I want an LLC in Texas")
            .await;
        assert_eq!(facts.extraction_method, Some(ExtractionMethod::Fallback));
        assert_eq!(facts.entity_type.as_deref(), Some("LLC"));
    }

    #[test]
    fn llm_blank_strings_normalized_to_null() {
        let facts = into_facts(LlmFacts {
            customer_name: Some("  ".into()),
            entity_type: Some("LLC".into()),
            ..Default::default()
        });
        assert!(facts.customer_name.is_none());
        assert_eq!(facts.entity_type.as_deref(), Some("LLC"));
        assert_eq!(facts.extraction_method, Some(ExtractionMethod::Llm));
    }
}
