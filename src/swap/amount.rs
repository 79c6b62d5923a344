//! Source amount input

use crate::chain::{CoinPretty, Currency};
use crate::error::SwapConfigError;

use serde::Serialize;

/// How a pending computation should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingState {
    /// Result pending, the form may still be submitted
    Loading,
    /// Result pending, submission must wait
    LoadingBlock,
}

/// Validity of a configuration as presented to the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiProperties {
    pub error: Option<SwapConfigError>,
    pub loading_state: Option<LoadingState>,
}

impl UiProperties {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(error: SwapConfigError) -> Self {
        Self {
            error: Some(error),
            loading_state: None,
        }
    }

    pub fn loading(state: LoadingState) -> Self {
        Self {
            error: None,
            loading_state: Some(state),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.loading_state.is_none()
    }
}

/// Source chain, currency and the decimal amount typed by the user
#[derive(Debug, Clone)]
pub struct AmountConfig {
    chain_id: String,
    currency: Option<Currency>,
    value: String,
}

impl AmountConfig {
    pub fn new(chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            currency: None,
            value: String::new(),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn currency(&self) -> Option<&Currency> {
        self.currency.as_ref()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Switching chains drops the selected currency
    pub fn set_chain(&mut self, chain_id: &str) {
        if self.chain_id != chain_id {
            self.chain_id = chain_id.to_string();
            self.currency = None;
        }
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = Some(currency);
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.trim().to_string();
    }

    /// The entered amount in base units of the selected currency
    pub fn amount(&self) -> Result<CoinPretty, SwapConfigError> {
        let currency = self
            .currency
            .clone()
            .ok_or(SwapConfigError::CurrencyNotSet)?;
        CoinPretty::from_decimal_str(currency, &self.value)
    }

    pub fn ui_properties(&self) -> UiProperties {
        match self.amount() {
            Err(e) => UiProperties::error(e),
            Ok(amount) if amount.is_zero() => UiProperties::error(SwapConfigError::ZeroAmount),
            Ok(_) => UiProperties::ok(),
        }
    }
}
