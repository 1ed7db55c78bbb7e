//! Grounded response synthesis (the RAG back half).
//!
//! Builds a single prompt from the assembled grounding context plus fixed
//! behavioral instructions and submits it once. Best-effort by contract:
//! any failure returns the fixed apology string, and the caller never
//! retries.

use std::sync::Arc;

use dg_domain::config::RetrievalConfig;
use dg_providers::{ChatRequest, LlmProvider};

use crate::assembler::GroundingContext;

/// Returned verbatim on any synthesis failure.
pub const APOLOGY: &str = "I'm sorry, I wasn't able to put together an answer \
just now. Please try again in a moment.";

const SYSTEM_PROMPT: &str = "You are a business-formation assistant continuing \
an ongoing relationship with this customer. Ground every statement in the \
context sections provided. Maintain continuity with past conversations. When \
you use reference knowledge, say so. Personalize advice using the business \
vision when present. If the gap section lists missing required fields, \
prioritize asking for those before anything else. Do not invent facts that \
are not in the context.";

pub struct ResponseSynthesizer {
    provider: Option<Arc<dyn LlmProvider>>,
    chat_model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseSynthesizer {
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        chat_model: impl Into<String>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
            max_tokens: config.answer_max_tokens,
            temperature: config.answer_temperature,
        }
    }

    /// Produce a grounded answer, or [`APOLOGY`] on any failure.
    pub async fn synthesize(&self, message: &str, context: &GroundingContext) -> String {
        let Some(provider) = self.provider.as_ref() else {
            tracing::warn!("no provider configured; returning apology response");
            return APOLOGY.to_owned();
        };

        let prompt = format!(
            "# Context\n{}\n# Customer message\n{message}",
            context.render()
        );
        let result = provider
            .chat(ChatRequest {
                system: Some(SYSTEM_PROMPT.to_owned()),
                user: prompt,
                temperature: Some(self.temperature),
                max_tokens: Some(self.max_tokens),
                json_mode: false,
                model: Some(self.chat_model.clone()),
            })
            .await;

        match result {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_owned()
            }
            Ok(_) => {
                tracing::warn!("synthesis returned empty content");
                APOLOGY.to_owned()
            }
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed");
                APOLOGY.to_owned()
            }
        }
    }
}
