#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("missing data directory")]
    MissingDataDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("embedding request timed out")]
    EmbeddingTimeout,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimMismatch { expected: usize, actual: usize },
    #[error("malformed stored vector for snippet {id}: {reason}")]
    MalformedVector { id: i64, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("snippet content is empty")]
    EmptyContent,
}

impl KnowledgeError {
    /// Whether the failure came from the external embedding service
    /// (unreachable, timed out, rejected) rather than local state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Embedding(_) | Self::EmbeddingTimeout
        )
    }
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
