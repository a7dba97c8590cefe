//! A calendar month, which is how the spreadsheets in the store are named.

use anyhow::{bail, Context};
use chrono::{Datelike, Local, Month, NaiveDate};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A year and month. Its key, e.g. `2026_october`, is the name of the spreadsheet holding that
/// month's expenses.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Period {
    year: i32,
    month: Month,
}

impl Period {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The period containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        // `month0` is always in 0..12.
        let month = Month::try_from(date.month0() as u8 + 1).unwrap_or(Month::January);
        Self {
            year: date.year(),
            month,
        }
    }

    /// The period containing today's local date.
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// The following calendar month, rolling December over into January of the next year.
    pub fn next(&self) -> Self {
        let year = match self.month {
            Month::December => self.year + 1,
            _ => self.year,
        };
        Self {
            year,
            month: self.month.succ(),
        }
    }

    /// The preceding calendar month, rolling January back into December of the previous year.
    pub fn previous(&self) -> Self {
        let year = match self.month {
            Month::January => self.year - 1,
            _ => self.year,
        };
        Self {
            year,
            month: self.month.pred(),
        }
    }

    /// The store name for this period: `<4-digit year>_<lowercase full month name>`.
    pub fn key(&self) -> String {
        format!("{:04}_{}", self.year, self.month.name().to_lowercase())
    }

    /// The store name for the expense report of this period.
    pub fn report_key(&self) -> String {
        format!("{}_report", self.key())
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('_')
            .with_context(|| format!("Period key must look like '2026_october', got '{s}'"))?;
        if year.len() != 4 {
            bail!("Period key must have a 4-digit year, got '{s}'");
        }
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in period key '{s}'"))?;
        let month: Month = month
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid month in period key '{s}'"))?;
        Ok(Self { year, month })
    }
}

/// Parses a `YYYY-MM-DD` date supplied by a caller.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}
