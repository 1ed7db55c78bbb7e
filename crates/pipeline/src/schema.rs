//! Webhook payload normalization.
//!
//! Call platforms deliver completion payloads in several shapes. We decode
//! into an explicit untagged union over the shapes we recognize and reduce
//! each to one canonical [`NormalizedCall`]. Unrecognized shapes are
//! rejected outright rather than guessed at.

use serde::Deserialize;

use dg_domain::error::{Error, Result};
use dg_domain::record::{Speaker, Turn};
use dg_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One message in either message-array shape.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// `"user"`, `"customer"`, `"human"` map to the user side; everything
    /// else is treated as the assistant.
    pub role: String,
    #[serde(alias = "content", alias = "text", alias = "message")]
    pub content: String,
}

/// The known webhook payload shapes, tried in order.
///
/// Serde's untagged representation tries each variant top-down, so the most
/// specific shape (artifact-nested) comes first and the loosest (bare
/// transcript) last.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    /// Messages nested under an `artifact` envelope.
    Artifact {
        #[serde(flatten)]
        meta: CallMeta,
        artifact: ArtifactBody,
    },
    /// A flat top-level `messages` array.
    Flat {
        #[serde(flatten)]
        meta: CallMeta,
        messages: Vec<WireMessage>,
    },
    /// A single pre-joined transcript string. Turn attribution is lost, so
    /// the whole text counts as user speech for extraction purposes.
    Transcript {
        #[serde(flatten)]
        meta: CallMeta,
        transcript: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct ArtifactBody {
    pub messages: Vec<WireMessage>,
}

/// Metadata fields common to all shapes. Everything is optional on the
/// wire; [`normalize`] enforces what is actually required.
#[derive(Debug, Default, Deserialize)]
pub struct CallMeta {
    #[serde(alias = "callId", alias = "call_id", alias = "id")]
    pub call_id: Option<String>,
    #[serde(alias = "callSessionId", alias = "call_session_id", alias = "sessionId")]
    pub call_session_id: Option<String>,
    #[serde(alias = "callStage", alias = "call_stage", alias = "stage")]
    pub call_stage: Option<u8>,
    #[serde(alias = "customerPhone", alias = "customer_phone", alias = "phone")]
    pub customer_phone: Option<String>,
    #[serde(alias = "customerEmail", alias = "customer_email", alias = "email")]
    pub customer_email: Option<String>,
    #[serde(alias = "customerId", alias = "customer_id")]
    pub customer_id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Canonical form
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The canonical conversation shape every payload reduces to.
#[derive(Debug, Clone)]
pub struct NormalizedCall {
    pub call_id: String,
    /// Session id, derived from the call id when the payload omits one.
    pub call_session_id: String,
    /// Stage hint from the payload, if any. Resolution against the user's
    /// progress happens later in the pipeline.
    pub call_stage: Option<u8>,
    /// The raw customer identifier (phone, email, or opaque id).
    pub identifier: String,
    pub full_transcript: String,
    pub turns: Vec<Turn>,
    pub user_messages: Vec<String>,
    pub assistant_messages: Vec<String>,
}

fn speaker_of(role: &str) -> Speaker {
    match role.to_ascii_lowercase().as_str() {
        "user" | "customer" | "human" => Speaker::User,
        _ => Speaker::Assistant,
    }
}

fn turns_from_messages(messages: &[WireMessage]) -> Vec<Turn> {
    messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| Turn {
            speaker: speaker_of(&m.role),
            text: m.content.trim().to_owned(),
        })
        .collect()
}

fn join_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let tag = match t.speaker {
                Speaker::User => "User",
                Speaker::Assistant => "Assistant",
            };
            format!("{tag}: {}", t.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize a decoded payload into the canonical shape.
///
/// Total over the recognized shapes: the only failures are a missing
/// customer identifier or an empty transcript, both [`Error::Input`].
pub fn normalize(payload: WebhookPayload) -> Result<NormalizedCall> {
    let (meta, turns, shape) = match payload {
        WebhookPayload::Artifact { meta, artifact } => {
            (meta, turns_from_messages(&artifact.messages), "artifact")
        }
        WebhookPayload::Flat { meta, messages } => {
            (meta, turns_from_messages(&messages), "flat")
        }
        WebhookPayload::Transcript { meta, transcript } => {
            let turns = if transcript.trim().is_empty() {
                vec![]
            } else {
                vec![Turn {
                    speaker: Speaker::User,
                    text: transcript.trim().to_owned(),
                }]
            };
            (meta, turns, "transcript")
        }
    };

    let identifier = meta
        .customer_phone
        .as_deref()
        .or(meta.customer_email.as_deref())
        .or(meta.customer_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Input("payload carries no customer identifier".into()))?
        .to_owned();

    if turns.is_empty() {
        return Err(Error::Input("payload carries no transcript text".into()));
    }

    let full_transcript = join_transcript(&turns);
    let call_id = meta
        .call_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let call_session_id = meta
        .call_session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("session-{call_id}"));

    let user_messages: Vec<String> = turns
        .iter()
        .filter(|t| t.speaker == Speaker::User)
        .map(|t| t.text.clone())
        .collect();
    let assistant_messages: Vec<String> = turns
        .iter()
        .filter(|t| t.speaker == Speaker::Assistant)
        .map(|t| t.text.clone())
        .collect();

    TraceEvent::WebhookNormalized {
        call_id: call_id.clone(),
        shape: shape.into(),
        transcript_chars: full_transcript.len(),
        user_turns: user_messages.len(),
        assistant_turns: assistant_messages.len(),
    }
    .emit();

    Ok(NormalizedCall {
        call_id,
        call_session_id,
        call_stage: meta.call_stage,
        identifier,
        full_transcript,
        turns,
        user_messages,
        assistant_messages,
    })
}

/// Decode raw JSON into a recognized payload shape, rejecting anything
/// that matches none of them.
pub fn decode(body: &[u8]) -> Result<WebhookPayload> {
    serde_json::from_slice(body)
        .map_err(|e| Error::Input(format!("unrecognized webhook payload shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(json: serde_json::Value) -> NormalizedCall {
        let payload = decode(&serde_json::to_vec(&json).unwrap()).unwrap();
        normalize(payload).unwrap()
    }

    #[test]
    fn all_three_shapes_normalize_equivalently() {
        let artifact = canonical(serde_json::json!({
            "callId": "c1",
            "customerPhone": "+15551234567",
            "artifact": { "messages": [
                { "role": "assistant", "content": "Hi, how can I help?" },
                { "role": "user", "content": "I want an LLC" }
            ]}
        }));
        let flat = canonical(serde_json::json!({
            "callId": "c1",
            "customerPhone": "+15551234567",
            "messages": [
                { "role": "assistant", "content": "Hi, how can I help?" },
                { "role": "user", "content": "I want an LLC" }
            ]
        }));
        assert_eq!(artifact.full_transcript, flat.full_transcript);
        assert_eq!(artifact.user_messages, flat.user_messages);
        assert_eq!(artifact.assistant_messages, flat.assistant_messages);

        let bare = canonical(serde_json::json!({
            "callId": "c1",
            "customerPhone": "+15551234567",
            "transcript": "I want an LLC"
        }));
        assert_eq!(bare.user_messages, vec!["I want an LLC"]);
        assert!(bare.assistant_messages.is_empty());
    }

    #[test]
    fn missing_identifier_is_fatal() {
        let payload = decode(
            serde_json::json!({ "callId": "c1", "transcript": "hello" })
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        let err = normalize(payload).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn empty_transcript_is_fatal() {
        let payload = decode(
            serde_json::json!({
                "customerEmail": "a@b.com",
                "messages": [{ "role": "user", "content": "   " }]
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();
        assert!(matches!(normalize(payload).unwrap_err(), Error::Input(_)));
    }

    #[test]
    fn unrecognized_shape_rejected() {
        let err = decode(br#"{ "foo": 1 }"#).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn session_id_derived_from_call_id_when_absent() {
        let call = canonical(serde_json::json!({
            "callId": "c9",
            "customerEmail": "a@b.com",
            "transcript": "hello"
        }));
        assert_eq!(call.call_session_id, "session-c9");
    }
}
