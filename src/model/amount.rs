//! Amount type for handling monetary values written in the Brazilian style.
//!
//! Spreadsheet exports format money as `R$ 1.234,56`: an optional currency symbol, `.` as the
//! thousands separator and `,` as the decimal separator. `Amount` parses such strings into a
//! `Decimal` and can write them back out the same way.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The currency symbol used when writing amounts.
const SYMBOL: &str = "R$";

/// Represents a monetary amount.
///
/// # Examples
///
/// ```
/// # use expense_sync::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("R$ 1.234,56").unwrap();
/// assert_eq!(amount.to_string(), "R$ 1.234,56");
/// assert_eq!(amount.value().to_string(), "1234.56");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// The value as a float, for JSON output.
    pub fn to_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or_default()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: Option<rust_decimal::Error>,
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?}, {:?})", self.input, self.source)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to parse '{}' as an amount", self.input)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |source| AmountError {
            input: s.to_string(),
            source,
        };

        // Sheets often pads the symbol with a non-breaking space.
        let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{a0}');

        // The sign may come before or after the currency symbol: "-R$ 5,00" or "R$ -5,00".
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.trim_start_matches(|c: char| !(c.is_ascii_digit() || c == '-' || c == ','));
        let (negative, rest) = match rest.strip_prefix('-') {
            Some(rest) => (!negative, rest),
            None => (negative, rest),
        };

        // Drop thousands separators, then use '.' as the decimal point.
        let normalized = rest.replace('.', "").replace(',', ".");
        if normalized.is_empty() || !normalized.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        {
            return Err(err(None));
        }

        let value = Decimal::from_str(&normalized).map_err(|e| err(Some(e)))?;
        Ok(Amount {
            value: if negative { -value } else { value },
        })
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.value.abs().round_dp(2);
        // format_num writes "1,234.56"; swap the separators for "1.234,56".
        let grouped = format_num::format_num!(",.2", num.to_f64().unwrap_or_default());
        let localized: String = grouped
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect();
        write!(f, "{sign}{SYMBOL} {localized}")
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
