//! Read-only commands.

use crate::commands::{period_for, Out};
use crate::model::{ExpenseTable, RemoteFile};
use crate::pipeline::Pipeline;
use crate::Result;

/// Returns the transformed rows of the month containing `date` (today when `None`).
pub async fn current(pipeline: &Pipeline, date: Option<&str>) -> Result<Out<ExpenseTable>> {
    let period = period_for(date)?;
    let table = pipeline.current(period).await?;
    Ok(Out::new(
        format!("Loaded {} expenses for {period}", table.len()),
        table,
    ))
}

/// Lists the files in the configured Drive folder.
pub async fn list(pipeline: &Pipeline) -> Result<Out<Vec<RemoteFile>>> {
    let files = pipeline.list().await?;
    let mut message = format!("{} files in folder {}", files.len(), pipeline.config().folder_id());
    for file in &files {
        message.push_str(&format!("\n  {} ({})", file.name, file.id));
    }
    Ok(Out::new(message, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SEED_PERIOD;
    use crate::error::ErrorType;
    use crate::model::FINAL_INSTALLMENT;
    use crate::test::TestEnv;
    use crate::Mode;

    #[tokio::test]
    async fn test_current() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline::new(env.config(), Mode::Testing).await.unwrap();
        let out = current(&pipeline, Some("2025-10-05")).await.unwrap();
        assert_eq!(out.message(), format!("Loaded 10 expenses for {SEED_PERIOD}"));
        let table = out.structure().unwrap();
        assert!(table.columns().iter().any(|c| c == FINAL_INSTALLMENT));
        // Nothing is written.
        assert!(env.get_state().iter().all(|f| !f.name.ends_with("_report")));
    }

    #[tokio::test]
    async fn test_current_missing() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline::new(env.config(), Mode::Testing).await.unwrap();
        let err = current(&pipeline, Some("2001-02-03")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_list() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline::new(env.config(), Mode::Testing).await.unwrap();
        let out = list(&pipeline).await.unwrap();
        assert!(out.message().contains(SEED_PERIOD));
        assert_eq!(out.structure().unwrap().len(), env.get_state().len());
    }
}
