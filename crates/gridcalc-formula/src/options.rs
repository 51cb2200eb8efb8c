//! Calculation options

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Separators used when text is coerced to a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberFormatInfo {
    pub decimal_separator: char,
    pub group_separator: char,
}

impl Default for NumberFormatInfo {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: ',',
        }
    }
}

/// Options for a calculation session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalculationOptions {
    /// Resolve circular references to a fallback value instead of failing
    pub allow_circular_references: bool,
    /// Locale used for string to number coercion
    pub number_format: NumberFormatInfo,
    /// Recalculate formulas built only from volatile functions (NOW, TODAY, RAND, ...)
    pub calculate_volatile: bool,
    /// Round numeric cell results to this many decimal places
    pub precision: Option<u32>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            allow_circular_references: false,
            number_format: NumberFormatInfo::default(),
            calculate_volatile: true,
            precision: None,
        }
    }
}

impl CalculationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn with_number_format(mut self, decimal_separator: char, group_separator: char) -> Self {
        self.number_format = NumberFormatInfo {
            decimal_separator,
            group_separator,
        };
        self
    }

    pub fn with_calculate_volatile(mut self, calculate: bool) -> Self {
        self.calculate_volatile = calculate;
        self
    }

    pub fn with_precision(mut self, digits: u32) -> Self {
        self.precision = Some(digits);
        self
    }

    /// Round a final result to the configured precision, half away from zero
    pub fn apply_precision(&self, value: f64) -> f64 {
        let Some(digits) = self.precision else {
            return value;
        };
        Decimal::from_f64(value)
            .map(|d| d.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_f64())
            .unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CalculationOptions::default();
        assert!(!options.allow_circular_references);
        assert!(options.calculate_volatile);
        assert_eq!(options.number_format.decimal_separator, '.');
        assert_eq!(options.apply_precision(1.23456), 1.23456);
    }

    #[test]
    fn test_precision_rounds_half_away_from_zero() {
        let options = CalculationOptions::new().with_precision(2);
        assert_eq!(options.apply_precision(2.345), 2.35);
        assert_eq!(options.apply_precision(-2.345), -2.35);
        assert_eq!(options.apply_precision(10.0), 10.0);
    }
}
