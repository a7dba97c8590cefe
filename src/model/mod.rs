//! Types that represent the core data model, such as `ExpenseTable` and `Amount`.
mod amount;
mod installment;
mod period;
mod table;

pub use amount::{Amount, AmountError};
pub use installment::Installment;
pub use period::{parse_date, Period};
pub use table::{
    ExpenseRecord, ExpenseTable, Value, AMOUNT, CATEGORY, CURRENT_INSTALLMENT, DESCRIPTION,
    EXPENSE_TYPE, FINAL_INSTALLMENT, FIXED, PAYMENT_TYPE, PERSON,
};
use serde::{Deserialize, Serialize};

/// A file held by the remote store.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}
