use thiserror::Error;

/// Core error kinds per spec section 7. Decode/spectrogram/peak/hash stages
/// propagate these upward without retry; store operations retry internally
/// and only escalate to `StoreError` after the contention budget is spent.
#[derive(Debug, Error)]
pub enum WaveMarkError {
    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("adapter failed to fetch audio or metadata: {0}")]
    Adapter(String),

    #[error("store write contended for {0:?} without succeeding")]
    StoreContention(std::time::Duration),

    #[error("store operation failed: {0}")]
    Store(String),

    #[error("no peaks or pairs could be generated from this audio")]
    EmptyFingerprint,

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, WaveMarkError>;

impl From<diesel::result::Error> for WaveMarkError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => WaveMarkError::StoreContention(std::time::Duration::from_secs(30)),
            other => WaveMarkError::Store(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for WaveMarkError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        WaveMarkError::Store(format!("connection pool error: {e}"))
    }
}

impl From<symphonia::core::errors::Error> for WaveMarkError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        WaveMarkError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for WaveMarkError {
    fn from(e: std::io::Error) -> Self {
        WaveMarkError::Decode(e.to_string())
    }
}
