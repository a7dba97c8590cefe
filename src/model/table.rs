//! The tabular representation of a month's expenses.
//!
//! A spreadsheet is exported by the store as CSV. Every row becomes an `ExpenseRecord`, a map of
//! column name to `Value`. The `ExpenseTable` keeps the column order of the source so that
//! writing it back out produces the same layout.

use crate::error::Res;
use crate::model::Installment;
use anyhow::{bail, Context};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

pub const DESCRIPTION: &str = "Description";
pub const EXPENSE_TYPE: &str = "ExpenseType";
pub const AMOUNT: &str = "Amount";
pub const PERSON: &str = "Person";
pub const CATEGORY: &str = "Category";
pub const PAYMENT_TYPE: &str = "PaymentType";
pub const CURRENT_INSTALLMENT: &str = "CurrentInstallment";
pub const FINAL_INSTALLMENT: &str = "FinalInstallment";

/// The `ExpenseType` value that exempts a record from installment filtering.
pub const FIXED: &str = "Fixed";

/// Cell contents that mean "no value" in a spreadsheet export.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "NA", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>",
];

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent-value marker. This is the only "no value" form after transformation.
    Null,
    /// A cell that was empty (or held a missing-value token) in the source.
    Missing,
    Integer(i64),
    /// May be non-finite until the table has been transformed.
    Number(f64),
    Text(String),
}

impl Value {
    /// Infers a typed value from a raw cell.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Value::Missing;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            // Keep things like account numbers with leading zeros as text.
            return if i.to_string() == trimmed {
                Value::Integer(i)
            } else {
                Value::Text(raw.to_string())
            };
        }
        if is_infinity(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Number(f);
            }
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            // Only when the number writes back as the same text. "1.500" and "2.50" stay text so
            // localized amounts are not misread and the cell is written back unchanged.
            let number = Value::Number(f);
            if number.to_string() == trimmed {
                return number;
            }
        }
        Value::Text(raw.to_string())
    }

    /// True for both absent-value forms.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Missing)
    }

    /// The value as text, or `None` for absent values.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Missing => None,
            other => Some(other.to_string()),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

fn is_infinity(s: &str) -> bool {
    let s = s.trim_start_matches(['+', '-']);
    s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinity")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null | Value::Missing => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.1}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Missing => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

/// One row of an expense spreadsheet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpenseRecord {
    fields: BTreeMap<String, Value>,
}

impl ExpenseRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `column`, if the record has that column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns the value of `column` as text, treating a missing column as absent.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::as_text)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Builder-style `set`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// The installment columns of a transformed record. Absent or non-integer columns read as 1.
    pub fn installment(&self) -> Installment {
        let read = |column| {
            self.get(column)
                .and_then(Value::as_integer)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or(1)
        };
        Installment::new(read(CURRENT_INSTALLMENT), read(FINAL_INSTALLMENT))
    }

    /// True when the record is a fixed (recurring) expense.
    pub fn is_fixed(&self) -> bool {
        self.text(EXPENSE_TYPE).as_deref() == Some(FIXED)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.fields.values_mut()
    }
}

impl Serialize for ExpenseRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// An ordered sequence of records sharing a set of columns. Serializes as an array of row
/// objects.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpenseTable {
    columns: Vec<String>,
    records: Vec<ExpenseRecord>,
}

impl ExpenseTable {
    /// Creates a table. Columns used by `records` but not named in `columns` are appended in
    /// the order they are first seen.
    pub fn new<S>(columns: impl IntoIterator<Item = S>, records: Vec<ExpenseRecord>) -> Self
    where
        S: Into<String>,
    {
        let mut table = Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records,
        };
        let extra: Vec<String> = table
            .records
            .iter()
            .flat_map(|r| r.fields.keys())
            .cloned()
            .collect();
        for column in extra {
            table.add_column(column);
        }
        table
    }

    /// Parses CSV content whose first row is the header.
    pub fn from_csv(data: &[u8]) -> Res<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .context("Unable to read the CSV header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                bail!("Encountered a duplicate header '{header}'");
            }
        }

        let mut records = Vec::new();
        for (row_ix, result) in reader.records().enumerate() {
            let row = result.with_context(|| format!("Unable to read CSV row {}", row_ix + 2))?;
            if row.len() > headers.len() {
                bail!(
                    "A row longer than the headers list was encountered at row {}",
                    row_ix + 2
                );
            }
            let mut record = ExpenseRecord::new();
            for (ix, header) in headers.iter().enumerate() {
                let value = row.get(ix).map(Value::parse).unwrap_or(Value::Missing);
                record.set(header.clone(), value);
            }
            records.push(record);
        }

        Ok(Self {
            columns: headers,
            records,
        })
    }

    /// Writes the table as CSV with a header row. Absent values are written as empty cells.
    pub fn to_csv(&self) -> Res<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.columns)
            .context("Unable to write the CSV header row")?;
        for record in &self.records {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| record.get(c).map(Value::to_string).unwrap_or_default())
                .collect();
            writer
                .write_record(&row)
                .context("Unable to write a CSV row")?;
        }
        writer.into_inner().context("Unable to flush CSV data")
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpenseRecord> {
        self.records.iter()
    }

    /// Appends `column` to the column list if it is not already present.
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    /// A new table with the same columns and only the records for which `keep` is true, in
    /// their original order.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&ExpenseRecord) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(*r)).cloned().collect(),
        }
    }
}

impl Serialize for ExpenseTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.records.serialize(serializer)
    }
}
