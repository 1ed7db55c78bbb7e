//! REST implementation of [`DataStore`].
//!
//! `RestDataStore` wraps a `reqwest::Client` and translates every trait
//! method into a PostgREST-dialect HTTP call (Supabase-compatible: `eq.`
//! filters, `order=` / `limit=` query params, upserts via
//! `Prefer: resolution=merge-duplicates`), with automatic retry +
//! exponential back-off on transient (5xx / timeout) failures.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use dg_domain::config::DatastoreConfig;
use dg_domain::error::{Error, Result};
use dg_domain::record::{ConversationRecord, DreamDna, KnowledgeSnippet, UserProfile};
use dg_domain::trace::TraceEvent;

use crate::store::DataStore;
use crate::types::{LegacyCallRecord, SessionProgress, StoredConversation, VectorRecord};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST-based client for the hosted relational + vector store.
///
/// Created once and reused for the lifetime of the gateway process. The
/// underlying `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestDataStore {
    http: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl RestDataStore {
    /// Build a new client from the shared [`DatastoreConfig`].
    pub fn new(cfg: &DatastoreConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
            Error::Config(format!(
                "datastore API key env var '{}' not set",
                cfg.api_key_env
            ))
        })?;

        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key,
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard auth headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Build the full URL for a table like `users`.
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient
    /// errors.
    ///
    /// * Retries on 5xx status codes and on timeouts.
    /// * Does **not** retry on 4xx (client errors are permanent).
    /// * Emits a `TraceEvent::DatastoreCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let rb = self.decorate(build_request());
            let result = rb.send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    TraceEvent::DatastoreCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() {
                        // 5xx — transient, retry
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::Datastore(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }

                    if resp.status().is_client_error() {
                        // 4xx — permanent, do NOT retry
                        let resp_status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        if resp_status == StatusCode::UNAUTHORIZED
                            || resp_status == StatusCode::FORBIDDEN
                        {
                            return Err(Error::Auth(format!(
                                "{endpoint} auth failed ({status}): {body}"
                            )));
                        }
                        return Err(Error::Datastore(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    let status = e.status().map(|s| s.as_u16()).unwrap_or(0);

                    TraceEvent::DatastoreCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    last_err = Some(from_reqwest(e));
                    // Timeouts and connection errors are transient — retry
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Datastore(format!("{endpoint}: all retries exhausted"))))
    }

    // ── typed helpers over the retry engine ──────────────────────────

    /// `GET /rest/v1/{table}` with filter query params, decoded as rows.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.table_url(table);
        let endpoint = format!("GET /rest/v1/{table}");
        let resp = self
            .execute_with_retry(&endpoint, || self.http.get(&url).query(query))
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Datastore(format!("failed to parse {table} rows: {e}: {body}")))
    }

    /// `POST /rest/v1/{table}` inserting one row.
    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let url = self.table_url(table);
        let endpoint = format!("POST /rest/v1/{table}");
        self.execute_with_retry(&endpoint, || {
            self.http
                .post(&url)
                .header("Prefer", "return=minimal")
                .json(row)
        })
        .await?;
        Ok(())
    }

    /// `POST /rest/v1/{table}?on_conflict=...` as an upsert.
    async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<()> {
        let url = self.table_url(table);
        let endpoint = format!("POST /rest/v1/{table} (upsert)");
        self.execute_with_retry(&endpoint, || {
            self.http
                .post(&url)
                .query(&[("on_conflict", on_conflict)])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(row)
        })
        .await?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl DataStore for RestDataStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select(
                "users",
                &[
                    ("customer_phone", format!("eq.{phone}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select(
                "users",
                &[
                    ("customer_email", format!("eq.{email}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select("users", &[("id", format!("eq.{id}")), ("limit", "1".into())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_user(&self, profile: UserProfile) -> Result<UserProfile> {
        let url = self.table_url("users");
        let resp = self
            .execute_with_retry("POST /rest/v1/users", || {
                self.http
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&profile)
            })
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        let rows: Vec<UserProfile> = serde_json::from_str(&body)
            .map_err(|e| Error::Datastore(format!("failed to parse created user: {e}: {body}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Datastore("create_user returned no row".into()))
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<()> {
        self.upsert("users", "id", &profile).await
    }

    async fn insert_conversation(&self, record: ConversationRecord) -> Result<()> {
        self.insert("call_transcripts", &record).await
    }

    async fn insert_vector_record(&self, row: VectorRecord) -> Result<()> {
        self.insert("vector_records", &row).await
    }

    async fn upsert_session_progress(&self, row: SessionProgress) -> Result<()> {
        self.upsert("session_progress", "user_id,session_id", &row)
            .await
    }

    async fn insert_legacy_record(&self, row: LegacyCallRecord) -> Result<()> {
        self.insert("legacy_call_records", &row).await
    }

    async fn recent_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredConversation>> {
        let records: Vec<ConversationRecord> = self
            .select(
                "call_transcripts",
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "created_at.desc".into()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        if records.is_empty() {
            return Ok(Vec::new());
        }

        // Join the stored embeddings by call id. A record with no vector
        // row simply carries no embedding; the ranker falls back to
        // recency for it.
        let ids = records
            .iter()
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let vectors: Vec<VectorRecord> = self
            .select(
                "vector_records",
                &[
                    ("call_id", format!("in.({ids})")),
                    (
                        "select",
                        "id,user_id,call_id,call_session_id,call_stage,summary,key_topics,\
                         embedding_model,full_transcript_embedding,user_turns_embedding,\
                         summary_embedding,metadata,created_at"
                            .into(),
                    ),
                ],
            )
            .await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let vector = vectors.iter().find(|v| v.call_id == record.id);
                StoredConversation {
                    summary: vector.and_then(|v| v.summary.clone()),
                    embedding_model: vector.map(|v| v.embedding_model.clone()),
                    full_transcript_embedding: vector
                        .and_then(|v| v.full_transcript_embedding.clone()),
                    record,
                }
            })
            .collect())
    }

    async fn list_knowledge(&self) -> Result<Vec<KnowledgeSnippet>> {
        self.select("knowledge_snippets", &[("order", "category.asc".into())])
            .await
    }

    async fn get_dream_dna(&self, user_id: &str) -> Result<Option<DreamDna>> {
        let rows: Vec<DreamDna> = self
            .select(
                "dream_dna",
                &[("user_id", format!("eq.{user_id}")), ("limit", "1".into())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        // A cheap HEAD-equivalent: select a single knowledge row.
        let url = self.table_url("knowledge_snippets");
        let resp = self
            .execute_with_retry("GET /rest/v1/knowledge_snippets (health)", || {
                self.http.get(&url).query(&[("limit", "1")])
            })
            .await?;

        Ok(serde_json::json!({
            "status": "ok",
            "http": resp.status().as_u16(),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
