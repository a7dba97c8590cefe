use crate::commands::{period_for, Out};
use crate::error::{Error, ErrorType};
use crate::model::ExpenseTable;
use crate::pipeline::{Pipeline, ReportFilters};
use crate::Result;

/// Sums the expenses of the month containing `date` (today when `None`) per expense type,
/// restricted to the rows matching every supplied filter. The report is saved to the store as
/// `<period>_report` and returned.
pub async fn report(
    pipeline: &Pipeline,
    date: Option<&str>,
    person: Option<&str>,
    category: Option<&str>,
    payment_type: Option<&str>,
) -> Result<Out<ExpenseTable>> {
    let period = period_for(date)?;
    let filters = ReportFilters {
        person: filter_value("person", person)?,
        category: filter_value("category", category)?,
        payment_type: filter_value("payment_type", payment_type)?,
    };
    let (saved, table) = pipeline.report(period, &filters).await?;
    let message = format!(
        "Report for {period} saved as {} with {} expense types.",
        saved.name,
        table.len()
    );
    Ok(Out::new(message, table))
}

/// A filter that is supplied must not be blank.
fn filter_value(name: &str, value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Err(Error::msg(
            ErrorType::Validation,
            format!("The '{name}' filter cannot be blank"),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Value, AMOUNT, EXPENSE_TYPE};
    use crate::test::TestEnv;
    use crate::Mode;

    #[tokio::test]
    async fn test_report() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline::new(env.config(), Mode::Testing).await.unwrap();
        let out = report(&pipeline, Some("2025-10-01"), Some("Bruno"), None, None)
            .await
            .unwrap();
        assert_eq!(
            out.message(),
            "Report for 2025_october saved as 2025_october_report with 2 expense types."
        );
        let table = out.structure().unwrap();
        let fixed = &table.records()[0];
        assert_eq!(fixed.text(EXPENSE_TYPE).as_deref(), Some("Fixed"));
        assert_eq!(fixed.get(AMOUNT), Some(&Value::Number(99.0)));
    }

    #[tokio::test]
    async fn test_blank_filter() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline::new(env.config(), Mode::Testing).await.unwrap();
        let err = report(&pipeline, None, None, Some("  "), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn test_filter_value() {
        assert_eq!(filter_value("person", None).unwrap(), None);
        assert_eq!(
            filter_value("person", Some("Ana")).unwrap(),
            Some("Ana".to_string())
        );
        assert!(filter_value("person", Some("")).is_err());
    }
}
