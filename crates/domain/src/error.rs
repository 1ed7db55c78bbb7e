/// Shared error type used across all DreamGate crates.
///
/// The first five variants are the pipeline failure taxonomy. Only
/// [`Error::Input`] aborts a webhook request; every other pipeline failure
/// degrades with logging (fallback extraction, skipped vector, partial
/// persistence, raw-identifier continuation).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing customer identifier or transcript. Fatal, not retryable.
    #[error("input: {0}")]
    Input(String),

    /// LLM call or JSON-parse failure during fact extraction.
    #[error("extraction: {0}")]
    Extraction(String),

    /// A single embedding vector failed to generate.
    #[error("embedding {vector}: {message}")]
    Embedding { vector: String, message: String },

    /// A single store write failed.
    #[error("persistence to {store}: {message}")]
    Persistence { store: String, message: String },

    /// Identity lookup failed; callers continue with the raw identifier.
    #[error("lookup: {0}")]
    Lookup(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("datastore: {0}")]
    Datastore(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
