//! Extraction of `current/total` installment markers from transaction descriptions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

/// Matches the first `NN/MM` pair, e.g. the `03/12` in `"TV SAMSUNG 03/12"`.
static INSTALLMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{2})/([0-9]{2})").expect("installment pattern is valid"));

/// The position of a purchase within its payment plan. A purchase that is not paid in parts is
/// represented as `1/1`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Installment {
    current: u32,
    total: u32,
}

impl Default for Installment {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl Installment {
    /// A purchase that is not an installment purchase.
    pub const SINGLE: Installment = Installment {
        current: 1,
        total: 1,
    };

    pub const fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }

    /// Finds the first two-digit/two-digit marker in `description`. Returns `1/1` when the
    /// description is absent or carries no marker. This never fails.
    pub fn extract(description: Option<&str>) -> Self {
        let Some(description) = description else {
            return Self::SINGLE;
        };
        let Some(captures) = INSTALLMENT.captures(description) else {
            return Self::SINGLE;
        };
        // Both groups are exactly two ASCII digits.
        match (captures[1].parse(), captures[2].parse()) {
            (Ok(current), Ok(total)) => Self { current, total },
            _ => Self::SINGLE,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// True when this is the last payment of the plan (or there is no plan).
    pub fn is_last(&self) -> bool {
        self.current == self.total
    }
}

impl Display for Installment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{:02}", self.current, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_none() {
        assert_eq!(Installment::extract(None), Installment::SINGLE);
    }

    #[test]
    fn test_extract_no_marker() {
        for text in ["Rent", "", "Uber 3/12", "1/2/3", "Pharmacy 2025", "ab/cd"] {
            assert_eq!(
                Installment::extract(Some(text)),
                Installment::SINGLE,
                "{text}"
            );
        }
    }

    #[test]
    fn test_extract_marker() {
        let installment = Installment::extract(Some("Groceries 03/12"));
        assert_eq!(installment.current(), 3);
        assert_eq!(installment.total(), 12);
        assert!(!installment.is_last());
    }

    #[test]
    fn test_extract_first_match_wins() {
        let installment = Installment::extract(Some("Notebook 05/10 ref 07/08"));
        assert_eq!(installment, Installment::new(5, 10));
    }

    #[test]
    fn test_extract_inside_longer_digits() {
        // Matches the first two-digit pair found anywhere in the text.
        let installment = Installment::extract(Some("Order 123/456"));
        assert_eq!(installment, Installment::new(23, 45));
    }

    #[test]
    fn test_extract_last() {
        assert!(Installment::extract(Some("Sofa 10/10")).is_last());
    }

    #[test]
    fn test_display() {
        assert_eq!(Installment::new(3, 12).to_string(), "03/12");
    }
}
