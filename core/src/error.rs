use thiserror::Error;

use crate::types::IssuerId;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("severity_score out of expected range for issuer {issuer_id}: {severity}")]
    Validation { issuer_id: IssuerId, severity: f64 },

    #[error("Invalid as-of date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid alert timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("Invalid scoring configuration: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ScoreResult<T> = Result<T, ScoreError>;
