use thiserror::Error;

use crate::types::StrategyKind;

/// Error taxonomy for the retrieval engine.
///
/// Configuration problems are caught at startup and never surface at
/// query time. Per-strategy failures are recovered locally by the engine;
/// callers only ever see `EmbeddingUnavailable` or `RetrievalUnavailable`.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("strategy {strategy} failed: {reason}")]
    StrategyFailure { strategy: StrategyKind, reason: String },

    #[error("strategy {strategy} timed out after {timeout_ms}ms")]
    StrategyTimeout { strategy: StrategyKind, timeout_ms: u64 },

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
