//! # Gateway Error Types
//!
//! Typed errors for caller misuse of the widget and pingback APIs.
//! Data-driven pingback failures (missing parameter, bad origin, bad signature)
//! are not errors; they are reported as validation diagnostics instead.

use thiserror::Error;

/// Core error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A digital goods widget already holds a product, or more than one was supplied
    #[error("only one product is allowed for the digital goods API")]
    OnlyOneProductAllowed,

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Address could not be parsed for allowlist configuration
    #[error("Invalid IP address: {address}")]
    InvalidAddress { address: String },

    /// Pingback failed validation
    #[error("Pingback rejected: {0}")]
    PingbackRejected(String),

    /// Error raised by an integrating application's pingback handler
    #[error("Pingback handler error: {0}")]
    Handler(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns true if the caller may retry the operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Handler(_))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Configuration(_) => 500,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::OnlyOneProductAllowed => 400,
            GatewayError::ProductNotFound { .. } => 404,
            GatewayError::InvalidAddress { .. } => 500,
            GatewayError::PingbackRejected(_) => 403,
            GatewayError::Handler(_) => 500,
            GatewayError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
