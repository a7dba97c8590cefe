use crate::error::{ErrorType, IntoResult, Result};
use crate::model::{
    Amount, ExpenseRecord, ExpenseTable, Value, AMOUNT, CATEGORY, EXPENSE_TYPE, PAYMENT_TYPE,
    PERSON,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Optional equality filters for a report. A filter that is `None` does not restrict anything.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReportFilters {
    pub person: Option<String>,
    pub category: Option<String>,
    pub payment_type: Option<String>,
}

impl ReportFilters {
    fn matches(&self, record: &ExpenseRecord) -> bool {
        [
            (PERSON, &self.person),
            (CATEGORY, &self.category),
            (PAYMENT_TYPE, &self.payment_type),
        ]
        .into_iter()
        .all(|(column, wanted)| match wanted {
            None => true,
            Some(wanted) => record.text(column).as_deref() == Some(wanted.as_str()),
        })
    }
}

/// Sums `Amount` per `ExpenseType` over the records that pass `filters`.
///
/// The result has the columns `ExpenseType` and `Amount`, one row per expense type, ordered by
/// expense type. Records without an expense type are left out, and a record without an amount
/// counts as zero. Fails with a parse error if any retained amount is not a valid amount.
pub fn aggregate(table: &ExpenseTable, filters: &ReportFilters) -> Result<ExpenseTable> {
    let mut sums: BTreeMap<String, Decimal> = BTreeMap::new();
    for record in table.iter().filter(|r| filters.matches(r)) {
        let amount = normalize(record.get(AMOUNT))?;
        let Some(expense_type) = record.text(EXPENSE_TYPE) else {
            continue;
        };
        *sums.entry(expense_type).or_default() += amount;
    }

    let records = sums
        .into_iter()
        .map(|(expense_type, sum)| {
            ExpenseRecord::new()
                .with(EXPENSE_TYPE, expense_type)
                .with(AMOUNT, Amount::new(sum).to_f64())
        })
        .collect();
    Ok(ExpenseTable::new([EXPENSE_TYPE, AMOUNT], records))
}

/// Reads a cell as a monetary amount in the localized currency format. Numeric cells go through
/// the same parser as text, so `1500` and `R$ 1.500,00` agree.
fn normalize(value: Option<&Value>) -> Result<Decimal> {
    match value {
        None => Ok(Decimal::ZERO),
        Some(value) if value.is_null() => Ok(Decimal::ZERO),
        Some(value) => Amount::from_str(&value.to_string())
            .map(|a| a.value())
            .pub_result(ErrorType::Parse),
    }
}
