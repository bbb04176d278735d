//! Errors surfaced by the host tooling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown copier '{0}' (see `memops-harness list`)")]
    UnknownCopier(String),
    #[error("unknown fill sweep '{0}' (expected sentinels|boundary|standard|exhaustive)")]
    UnknownFillSweep(String),
    #[error("invalid shard count {0}; must be at least 1")]
    InvalidShard(u64),
    #[error("conformance mismatch: {0}")]
    Mismatch(memops_abi::Mismatch),
    #[error("log validation failed: {errors} error(s) in {lines} line(s)")]
    InvalidLog { lines: usize, errors: usize },
}
