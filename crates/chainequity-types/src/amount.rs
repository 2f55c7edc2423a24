use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::TypesError;

/// A non-negative 256-bit integer in the token's smallest unit, stored as a
/// decimal string so it survives JSON and SQLite round-trips without losing
/// precision a native 256-bit type can't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RawAmount(U256);

impl RawAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        trimmed
            .parse::<U256>()
            .map(Self)
            .map_err(|_| TypesError::InvalidAmount(raw.to_string()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// `raw * multiplier_bps / BASIS_POINTS`, the display-balance formula:
    /// balances are stored pre-split and scaled up by the cumulative
    /// multiplier only when rendered.
    pub fn apply_split_multiplier(&self, multiplier_bps: u64) -> U256 {
        self.0
            .saturating_mul(U256::from(multiplier_bps))
            .wrapping_div(U256::from(crate::BASIS_POINTS))
    }

    /// Inverse of [`Self::apply_split_multiplier`]: recovers the pre-split
    /// raw storage unit from an on-chain (post-split, display) balance. The
    /// indexer uses this to keep cached balances expressed in raw units so
    /// a `StockSplit` never requires rewriting existing `Balance` rows.
    pub fn from_display_units(display: U256, multiplier_bps: u64) -> Self {
        if multiplier_bps == 0 {
            return Self::ZERO;
        }

        Self(
            display
                .saturating_mul(U256::from(crate::BASIS_POINTS))
                .wrapping_div(U256::from(multiplier_bps)),
        )
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RawAmount {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RawAmount> for String {
    fn from(value: RawAmount) -> Self {
        value.to_string()
    }
}

impl From<U256> for RawAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_decimal_string() {
        let amount = RawAmount::parse("1000000000000000000000").unwrap();
        assert_eq!(amount.to_string(), "1000000000000000000000");
    }

    #[test]
    fn split_multiplier_doubles_display_value() {
        let amount = RawAmount::parse("500").unwrap();
        assert_eq!(amount.apply_split_multiplier(20_000), U256::from(1000u64));
    }

    #[test]
    fn rejects_garbage() {
        assert!(RawAmount::parse("not-a-number").is_err());
    }

    #[test]
    fn from_display_units_is_the_inverse_of_apply_split_multiplier() {
        let raw = RawAmount::parse("500").unwrap();
        let display = raw.apply_split_multiplier(20_000);
        assert_eq!(RawAmount::from_display_units(display, 20_000), raw);
    }
}
