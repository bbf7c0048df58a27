//! Error types for vigil-core.
//!
//! Validation failures are the only errors surfaced to an ingestion caller.
//! Computation and mirror failures stay inside the analytics path: they are
//! logged and the affected result is skipped.

use thiserror::Error;

/// Errors returned synchronously by [`crate::IngestionPipeline::ingest`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// The reading carried an empty source key.
    #[error("validation error: key is required")]
    EmptyKey,

    /// The reading value is NaN or infinite.
    #[error("validation error: value for key {key} is not finite")]
    NonFiniteValue { key: String },
}

impl IngestError {
    /// Whether this error describes a malformed reading.
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::EmptyKey | IngestError::NonFiniteValue { .. })
    }
}

/// A statistic could not be computed for a reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    /// The rolling average or z-score came out NaN or infinite.
    #[error("{statistic} for key {key} is not finite")]
    NonFinite {
        key: String,
        statistic: &'static str,
    },
}

/// Errors raised by a [`crate::Mirror`] implementation.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The backing store could not be reached.
    #[error("mirror unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded for the mirror.
    #[error("mirror serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration rejected by [`crate::EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;
