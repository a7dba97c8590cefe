use crate::model::{
    ExpenseTable, Installment, Value, CURRENT_INSTALLMENT, DESCRIPTION, FINAL_INSTALLMENT,
};

/// Produces a new table in which every record carries `CurrentInstallment` and
/// `FinalInstallment` (derived from its `Description`), and in which every non-finite number and
/// every missing cell has been replaced by `Value::Null`.
///
/// Applying this to its own output yields the same table.
pub fn transform(table: &ExpenseTable) -> ExpenseTable {
    let records = table
        .iter()
        .map(|record| {
            let mut record = record.clone();
            for value in record.values_mut() {
                let absent = match value {
                    Value::Number(n) => !n.is_finite(),
                    Value::Missing => true,
                    _ => false,
                };
                if absent {
                    *value = Value::Null;
                }
            }
            let installment = Installment::extract(record.text(DESCRIPTION).as_deref());
            record.set(CURRENT_INSTALLMENT, i64::from(installment.current()));
            record.set(FINAL_INSTALLMENT, i64::from(installment.total()));
            record
        })
        .collect();

    let mut transformed = ExpenseTable::new(table.columns().iter().cloned(), records);
    transformed.add_column(CURRENT_INSTALLMENT);
    transformed.add_column(FINAL_INSTALLMENT);
    transformed
}
