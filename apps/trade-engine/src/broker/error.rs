//! Broker-layer errors.

/// Errors from a broker adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Network-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Rate limited by the broker.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds the broker asked us to wait.
        retry_after_secs: u64,
    },

    /// Retries exhausted on a retryable condition.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Attempts made.
        attempts: u32,
    },

    /// Credentials rejected.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Broker rejected the order outright.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// No such order.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The missing order's ID.
        order_id: String,
    },

    /// Order already terminal, cannot cancel.
    #[error("order not cancelable: {order_id}")]
    OrderNotCancelable {
        /// The order's ID.
        order_id: String,
    },

    /// Broker API returned a structured error.
    #[error("API error {code}: {message}")]
    Api {
        /// Broker error code.
        code: String,
        /// Broker error message.
        message: String,
    },

    /// Response could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl BrokerError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. } | Self::MaxRetriesExceeded { .. }
        )
    }
}
