use thiserror::Error;

#[derive(Debug, Error)]
pub enum KpiError {
    #[error("Malformed collection: {collection}[{index}] — {reason}")]
    MalformedCollection {
        collection: String,
        index: usize,
        reason: String,
    },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for KpiError {
    fn from(e: serde_json::Error) -> Self {
        KpiError::SerializationError(e.to_string())
    }
}
