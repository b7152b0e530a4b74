//! Error types for market-data provider operations.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while fetching data from a market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status and no usable body.
    #[error("provider returned HTTP {status} for '{symbol}'")]
    Status {
        /// Symbol the request was made for.
        symbol: String,
        /// HTTP status code.
        status: u16,
    },

    /// The provider does not know the symbol.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound {
        /// Symbol that was not found.
        symbol: String,
    },

    /// The provider reported an error in its response envelope.
    #[error("provider error: {message}")]
    Api {
        /// Error text reported by the provider.
        message: String,
    },

    /// The response could not be understood.
    #[error("malformed provider response: {message}")]
    Malformed {
        /// Description of what's wrong.
        message: String,
    },
}

impl ProviderError {
    /// Creates a symbol-not-found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    /// Creates a provider-reported error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
