//! Account value types.

use serde::{Deserialize, Serialize};

/// A single account metric (`NetLiquidation`, `BuyingPower`, ...).
///
/// Values arrive as strings; some metrics are not numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountValue {
    /// Metric name (cache key).
    pub key: String,
    /// Raw value.
    pub value: String,
    /// Currency code, empty for non-monetary metrics.
    #[serde(default)]
    pub currency: String,
    /// Reporting account.
    pub account: String,
}

impl AccountValue {
    /// Create an account value.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        currency: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            currency: currency.into(),
            account: account.into(),
        }
    }

    /// Parse the value as a decimal, if numeric.
    #[must_use]
    pub fn as_decimal(&self) -> Option<rust_decimal::Decimal> {
        self.value.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn numeric_and_text_values() {
        let net_liq = AccountValue::new("NetLiquidation", "100250.75", "USD", "DU1");
        assert_eq!(net_liq.as_decimal(), Some(dec!(100250.75)));

        let account_type = AccountValue::new("AccountType", "INDIVIDUAL", "", "DU1");
        assert_eq!(account_type.as_decimal(), None);
    }
}
