//! Error types for the swap route engine

use thiserror::Error;

/// Main error type for route service access and transaction building
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Route service returned {status} for {path}: {message}")]
    RouteService {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Schema validation failed at {path}: expected {expected}")]
    SchemaValidation { path: String, expected: String },

    #[error("Invalid fee format: {0}")]
    InvalidFeeFormat(String),

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: String },

    #[error("Response is empty")]
    ResponseNotFetched,

    #[error("Msgs is empty")]
    EmptyMessages,

    #[error("Msgs is too many: {count}")]
    TooManyMessages { count: usize },

    #[error("Can't calculate msg")]
    MessageNotComputable,

    #[error("Swap query is not initialized")]
    NotInitialized,

    #[error("Failed to fetch msgs_direct")]
    NotFetched,

    #[error("{0}")]
    Fetch(std::sync::Arc<SwapError>),

    #[error("Tx is not ready")]
    TxNotReady,

    #[error("Price change has been detected while building your transaction (prior {prior}, current {current}). Please try again")]
    PriceChanged { prior: String, current: String },

    #[error("Account error for chain {chain_id}: {message}")]
    Account { chain_id: String, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Fetch aborted for {key}")]
    Aborted { key: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwapError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SwapError::Http(e) => e.is_timeout() || e.is_connect(),
            SwapError::RouteService { status, .. } => *status == 429 || *status >= 500,
            SwapError::Aborted { .. } => true,
            _ => false,
        }
    }

    /// Check if error indicates the route service broke its response contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SwapError::SchemaValidation { .. } | SwapError::InvalidFeeFormat(_)
        )
    }
}

/// Result type for swap operations
pub type SwapResult<T> = Result<T, SwapError>;

/// Reasons a swap configuration is not valid for signing.
///
/// These are surfaced through `UiProperties` and never thrown.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapConfigError {
    #[error("Amount is empty")]
    EmptyAmount,

    #[error("Invalid number")]
    InvalidNumberAmount,

    #[error("Amount is zero")]
    ZeroAmount,

    #[error("Amount is negative")]
    NegativeAmount,

    #[error("Amount has more than {max_decimals} decimals")]
    TooManyDecimals { max_decimals: u32 },

    #[error("Currency is not set")]
    CurrencyNotSet,

    #[error("Swap query is not initialized")]
    NotInitialized,

    #[error("{0}")]
    RouteService(String),

    #[error("In and out currency is same")]
    SameCurrency,

    #[error("The currency you are swapping from is currently not supported")]
    UnsupportedSourceCurrency,

    #[error("The currency you are swapping to is currently not supported")]
    UnsupportedDestinationCurrency,

    #[error("Swap can't be executed with ibc pfm")]
    MultiTxRoute { txs_required: Option<u64> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let server = SwapError::RouteService {
            path: "/v2/fungible/route".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(server.is_retryable());

        let bad_request = SwapError::RouteService {
            path: "/v2/fungible/route".to_string(),
            status: 400,
            message: "bad".to_string(),
        };
        assert!(!bad_request.is_retryable());

        assert!(!SwapError::InvalidFeeFormat("abcusdc".to_string()).is_retryable());
        assert!(SwapError::InvalidFeeFormat("abcusdc".to_string()).is_contract_violation());
    }
}
