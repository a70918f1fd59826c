use thiserror::Error;

/// Typed error hierarchy for wabridge.
///
/// Use at module boundaries (gateway requests, store operations, config
/// validation). Internal/leaf functions can continue using `anyhow::Result` —
/// the `Internal` variant allows seamless conversion via the `?` operator.
///
/// Malformed or unknown webhook payloads are deliberately NOT errors: the
/// ingestion pipeline maps them to an empty outcome so that a noisy gateway
/// can never break the delivery stream.
#[derive(Debug, Error)]
pub enum WabridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway request failed: {message}")]
    Gateway { message: String },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using `WabridgeError`.
pub type WabridgeResult<T> = std::result::Result<T, WabridgeError>;

impl WabridgeError {
    /// Whether this error came from the remote gateway (caller decides retry).
    pub fn is_gateway(&self) -> bool {
        matches!(self, WabridgeError::Gateway { .. })
    }
}
