//! Currencies, coin amounts and denom classification

use crate::config::CurrencyConfig;
use crate::error::SwapConfigError;

use ethers::types::U256;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Prefix of locally synthesized ERC-20 denoms
pub const ERC20_DENOM_PREFIX: &str = "erc20:";
/// Prefix of bridged IBC denoms
pub const IBC_DENOM_PREFIX: &str = "ibc/";

/// A currency known to a chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Currency {
    pub coin_minimal_denom: String,
    pub coin_denom: String,
    pub coin_decimals: u32,
}

impl Currency {
    pub fn new(coin_minimal_denom: &str, coin_denom: &str, coin_decimals: u32) -> Self {
        Self {
            coin_minimal_denom: coin_minimal_denom.to_string(),
            coin_denom: coin_denom.to_string(),
            coin_decimals,
        }
    }

    /// Placeholder for a denom no chain declares; amounts are shown in base units
    pub fn raw(denom: &str) -> Self {
        Self::new(denom, denom, 0)
    }
}

impl From<&CurrencyConfig> for Currency {
    fn from(config: &CurrencyConfig) -> Self {
        Self::new(
            &config.coin_minimal_denom,
            &config.coin_denom,
            config.coin_decimals,
        )
    }
}

/// Plain base-unit coin as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// An integer base-unit amount of a currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinPretty {
    currency: Currency,
    amount: U256,
}

impl CoinPretty {
    pub fn new(currency: Currency, amount: U256) -> Self {
        Self { currency, amount }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, U256::zero())
    }

    /// Parse an integer base-unit string such as `"1000000"`
    pub fn from_base_units(currency: Currency, amount: &str) -> Option<Self> {
        U256::from_dec_str(amount.trim())
            .ok()
            .map(|amount| Self::new(currency, amount))
    }

    /// Parse a user-facing decimal such as `"1.5"` into base units
    pub fn from_decimal_str(currency: Currency, value: &str) -> Result<Self, SwapConfigError> {
        let amount = parse_units(value, currency.coin_decimals)?;
        Ok(Self::new(currency, amount))
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Exact decimal representation without trailing zeros
    pub fn to_decimal_string(&self) -> String {
        format_units(self.amount, self.currency.coin_decimals)
    }

    /// Decimal value, if it fits in a `Decimal`
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.to_decimal_string()).ok()
    }

    pub fn to_coin(&self) -> Coin {
        Coin {
            denom: self.currency.coin_minimal_denom.clone(),
            amount: self.amount.to_string(),
        }
    }
}

impl fmt::Display for CoinPretty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency.coin_denom)
    }
}

/// Render base units as a decimal string
pub fn format_units(amount: U256, decimals: u32) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Parse a decimal string into base units
pub fn parse_units(value: &str, decimals: u32) -> Result<U256, SwapConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SwapConfigError::EmptyAmount);
    }
    if value.starts_with('-') {
        return Err(SwapConfigError::NegativeAmount);
    }

    let (int_part, frac_part) = match value.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (value, ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return Err(SwapConfigError::InvalidNumberAmount);
    }

    if frac_part.len() > decimals as usize {
        return Err(SwapConfigError::TooManyDecimals {
            max_decimals: decimals,
        });
    }

    let combined = format!(
        "{}{}{}",
        int_part,
        frac_part,
        "0".repeat(decimals as usize - frac_part.len())
    );
    let combined = combined.trim_start_matches('0');
    if combined.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(combined).map_err(|_| SwapConfigError::InvalidNumberAmount)
}

/// Classification of a denom string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenomType {
    Native,
    Ibc,
    Erc20,
}

/// Splits a denom into its type and, for contract tokens, the contract address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenomHelper {
    denom: String,
    denom_type: DenomType,
    contract_address: Option<String>,
}

impl DenomHelper {
    pub fn new(denom: &str) -> Self {
        if let Some(contract) = denom.strip_prefix(ERC20_DENOM_PREFIX) {
            return Self {
                denom: denom.to_string(),
                denom_type: DenomType::Erc20,
                contract_address: Some(contract.to_string()),
            };
        }

        let denom_type = if denom.starts_with(IBC_DENOM_PREFIX) {
            DenomType::Ibc
        } else {
            DenomType::Native
        };

        Self {
            denom: denom.to_string(),
            denom_type,
            contract_address: None,
        }
    }

    /// Synthesize the local denom of an ERC-20 token
    pub fn erc20_denom(contract: &str) -> String {
        format!("{}{}", ERC20_DENOM_PREFIX, contract)
    }

    pub fn denom_type(&self) -> &DenomType {
        &self.denom_type
    }

    pub fn contract_address(&self) -> Option<&str> {
        self.contract_address.as_deref()
    }

    /// The denom as the route service expects it: contract address for ERC-20 tokens
    pub fn service_denom(&self) -> &str {
        self.contract_address.as_deref().unwrap_or(&self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Currency {
        Currency::new("uusdc", "USDC", 6)
    }

    #[test]
    fn test_out_amount_display_with_decimals() {
        let coin = CoinPretty::from_base_units(usdc(), "1000000").unwrap();
        assert_eq!(coin.to_decimal_string(), "1");
        assert_eq!(coin.to_decimal(), Some(Decimal::ONE));
        assert_eq!(coin.to_string(), "1 USDC");
    }

    #[test]
    fn test_format_units_small_and_fractional() {
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::zero(), 6), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_units("0", 6).unwrap(), U256::zero());
        assert_eq!(parse_units("", 6), Err(SwapConfigError::EmptyAmount));
        assert_eq!(parse_units("-1", 6), Err(SwapConfigError::NegativeAmount));
        assert_eq!(parse_units("1.2.3", 6), Err(SwapConfigError::InvalidNumberAmount));
        assert_eq!(parse_units("abc", 6), Err(SwapConfigError::InvalidNumberAmount));
        assert_eq!(
            parse_units("0.0000001", 6),
            Err(SwapConfigError::TooManyDecimals { max_decimals: 6 })
        );
    }

    #[test]
    fn test_denom_helper() {
        let erc20 = DenomHelper::new("erc20:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(erc20.denom_type(), &DenomType::Erc20);
        assert_eq!(
            erc20.service_denom(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );

        let ibc = DenomHelper::new("ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2");
        assert_eq!(ibc.denom_type(), &DenomType::Ibc);
        assert!(ibc.contract_address().is_none());

        let native = DenomHelper::new("uosmo");
        assert_eq!(native.denom_type(), &DenomType::Native);
        assert_eq!(native.service_denom(), "uosmo");
    }
}
