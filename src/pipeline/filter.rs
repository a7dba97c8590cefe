use crate::model::{ExpenseRecord, ExpenseTable};

/// Keeps the records that still have payments due next period: those whose installment is not
/// the last one, plus every fixed expense regardless of its installment. Order is preserved.
pub fn filter_non_final(table: &ExpenseTable) -> ExpenseTable {
    table.filtered(carries_over)
}

fn carries_over(record: &ExpenseRecord) -> bool {
    !record.installment().is_last() || record.is_fixed()
}
