//! The expense pipeline: load a month's sheet from the store, transform it, then either roll it
//! forward into next month, aggregate it into a report, or hand it back as is.

mod aggregate;
mod filter;
mod transform;

pub use aggregate::{aggregate, ReportFilters};
pub use filter::filter_non_final;
pub use transform::transform;

use crate::api::{self, Mode, Store};
use crate::error::{ErrorType, IntoResult};
use crate::model::{ExpenseTable, Period, RemoteFile};
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// A table that was written to the store.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SavedFile {
    pub id: String,
    pub name: String,
    /// True when an existing file of the same name was overwritten.
    pub replaced: bool,
}

/// Runs the expense use cases against a `Store`.
pub struct Pipeline {
    config: Config,
    store: Box<dyn Store + Send + Sync>,
}

impl Pipeline {
    /// Creates a pipeline backed by the store selected by `mode`.
    pub async fn new(config: Config, mode: Mode) -> Result<Self> {
        let store = api::store(&config, mode).await?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Downloads, parses and transforms the sheet for `period`.
    pub async fn load(&self, period: Period) -> Result<ExpenseTable> {
        let name = period.key();
        debug!("Loading '{name}'");
        let bytes = self.store.download(&name, self.config.folder_id()).await?;
        let table = ExpenseTable::from_csv(&bytes)
            .with_context(|| format!("Unable to parse '{name}'"))
            .pub_result(ErrorType::Parse)?;
        debug!("Loaded {} rows from '{name}'", table.len());
        Ok(transform(&table))
    }

    /// Writes the expenses of `period` that carry over (unfinished installments and fixed
    /// expenses) to the sheet of the following period.
    pub async fn generate_next(&self, period: Period) -> Result<SavedFile> {
        let table = self.load(period).await?;
        let carried = filter_non_final(&table);
        info!(
            "{} of {} expenses from '{period}' carry over into '{}'",
            carried.len(),
            table.len(),
            period.next()
        );
        self.persist(&period.next().key(), &carried).await
    }

    /// Sums the expenses of `period` per expense type, saves the result as the period's report
    /// and returns it.
    pub async fn report(
        &self,
        period: Period,
        filters: &ReportFilters,
    ) -> Result<(SavedFile, ExpenseTable)> {
        let table = self.load(period).await?;
        let report = aggregate(&table, filters)
            .map_err(|e| e.context(format!("Unable to aggregate '{period}'")))?;
        let saved = self.persist(&period.report_key(), &report).await?;
        Ok((saved, report))
    }

    /// The transformed rows of `period`. Nothing is written.
    pub async fn current(&self, period: Period) -> Result<ExpenseTable> {
        self.load(period).await
    }

    /// Every file in the configured folder.
    pub async fn list(&self) -> Result<Vec<RemoteFile>> {
        self.store.list(self.config.folder_id()).await
    }

    /// Uploads `table` as `name`, overwriting the file of that name if one exists. The table is
    /// staged as a local CSV file which is always removed afterwards.
    async fn persist(&self, name: &str, table: &ExpenseTable) -> Result<SavedFile> {
        let folder = self.config.folder_id();
        let existing = self
            .store
            .list(folder)
            .await?
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.id);

        let staged = self.config.staging().join(format!("{name}.csv"));
        let uploaded = self
            .upload_staged(name, table, &staged, existing.as_deref())
            .await;
        if staged.exists() {
            if let Err(e) = utils::remove(&staged).await {
                warn!("Unable to clean up the staging file: {e:#}");
            }
        }

        let id = uploaded?;
        info!("Saved '{name}' ({id})");
        Ok(SavedFile {
            id,
            name: name.to_string(),
            replaced: existing.is_some(),
        })
    }

    async fn upload_staged(
        &self,
        name: &str,
        table: &ExpenseTable,
        staged: &Path,
        existing: Option<&str>,
    ) -> Result<String> {
        let csv = table
            .to_csv()
            .with_context(|| format!("Unable to write '{name}' as CSV"))
            .pub_result(ErrorType::Parse)?;
        utils::write(staged, csv)
            .await
            .pub_result(ErrorType::Service)?;
        self.store
            .upload(name, staged, self.config.folder_id(), existing)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{StoredFile, SEED_PERIOD};
    use crate::model::{Value, AMOUNT, CURRENT_INSTALLMENT, DESCRIPTION, EXPENSE_TYPE};
    use crate::test::TestEnv;

    fn seed_period() -> Period {
        SEED_PERIOD.parse().unwrap()
    }

    async fn pipeline(env: &TestEnv) -> Pipeline {
        Pipeline::new(env.config(), Mode::Testing).await.unwrap()
    }

    fn descriptions(table: &ExpenseTable) -> Vec<String> {
        table.iter().filter_map(|r| r.text(DESCRIPTION)).collect()
    }

    async fn staging_is_empty(config: &Config) -> bool {
        let mut entries = tokio::fs::read_dir(config.staging()).await.unwrap();
        entries.next_entry().await.unwrap().is_none()
    }

    #[tokio::test]
    async fn test_load_transforms() {
        let env = TestEnv::new().await;
        let table = pipeline(&env).await.load(seed_period()).await.unwrap();
        assert_eq!(table.len(), 10);
        assert!(table.columns().iter().any(|c| c == CURRENT_INSTALLMENT));
        let notebook = &table.records()[3];
        assert_eq!(notebook.get(CURRENT_INSTALLMENT), Some(&Value::Integer(3)));
    }

    #[tokio::test]
    async fn test_load_missing_period() {
        let env = TestEnv::new().await;
        let err = pipeline(&env)
            .await
            .load("1999_january".parse().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_load_malformed_sheet() {
        let env = TestEnv::new().await;
        env.set_state(vec![StoredFile {
            id: "1".into(),
            name: SEED_PERIOD.into(),
            content: b"A,B\n1,2,3\n".to_vec(),
        }]);
        let err = pipeline(&env).await.load(seed_period()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
        assert!(err.to_string().contains(SEED_PERIOD));
    }

    #[tokio::test]
    async fn test_generate_next() {
        let env = TestEnv::new().await;
        let pipeline = pipeline(&env).await;
        let saved = pipeline.generate_next(seed_period()).await.unwrap();
        assert_eq!(saved.name, "2025_november");
        assert!(!saved.replaced);

        let next = pipeline.load(seed_period().next()).await.unwrap();
        assert_eq!(
            descriptions(&next),
            vec!["Rent", "Internet", "Notebook 03/10", "Gym", "Flight 01/06"]
        );
        assert!(staging_is_empty(pipeline.config()).await);
    }

    #[tokio::test]
    async fn test_generate_next_twice_overwrites() {
        let env = TestEnv::new().await;
        let pipeline = pipeline(&env).await;
        let first = pipeline.generate_next(seed_period()).await.unwrap();
        let second = pipeline.generate_next(seed_period()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.replaced);
        let named: Vec<_> = env
            .get_state()
            .into_iter()
            .filter(|f| f.name == "2025_november")
            .collect();
        assert_eq!(named.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_next_rolls_over_the_year() {
        let env = TestEnv::new().await;
        env.set_state(vec![StoredFile {
            id: "dec".into(),
            name: "2025_december".into(),
            content: b"Description,ExpenseType,Amount\nRent,Fixed,\"R$ 10,00\"\n".to_vec(),
        }]);
        let saved = pipeline(&env)
            .await
            .generate_next("2025_december".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(saved.name, "2026_january");
    }

    #[tokio::test]
    async fn test_report() {
        let env = TestEnv::new().await;
        let pipeline = pipeline(&env).await;
        let (saved, report) = pipeline
            .report(seed_period(), &ReportFilters::default())
            .await
            .unwrap();
        assert_eq!(saved.name, "2025_october_report");
        let rows: Vec<(Option<String>, Option<&Value>)> = report
            .iter()
            .map(|r| (r.text(EXPENSE_TYPE), r.get(AMOUNT)))
            .collect();
        assert_eq!(
            rows,
            vec![
                (Some("Fixed".to_string()), Some(&Value::Number(2718.9))),
                (Some("Variable".to_string()), Some(&Value::Number(3301.98))),
            ]
        );
        assert!(env.get_state().iter().any(|f| f.name == saved.name));
        assert!(staging_is_empty(pipeline.config()).await);
    }

    #[tokio::test]
    async fn test_report_with_filters() {
        let env = TestEnv::new().await;
        let filters = ReportFilters {
            person: Some("Ana".into()),
            payment_type: Some("Credit".into()),
            ..Default::default()
        };
        let (_, report) = pipeline(&env)
            .await
            .report(seed_period(), &filters)
            .await
            .unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.records()[0].get(AMOUNT),
            Some(&Value::Number(1545.06))
        );
    }

    #[tokio::test]
    async fn test_report_bad_amount_writes_nothing() {
        let env = TestEnv::new().await;
        env.set_state(vec![StoredFile {
            id: "1".into(),
            name: SEED_PERIOD.into(),
            content: b"Description,ExpenseType,Amount\nRent,Fixed,lots\n".to_vec(),
        }]);
        let pipeline = pipeline(&env).await;
        let err = pipeline
            .report(seed_period(), &ReportFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
        assert_eq!(env.get_state().len(), 1);
        assert!(staging_is_empty(pipeline.config()).await);
    }

    #[tokio::test]
    async fn test_list() {
        let env = TestEnv::new().await;
        let files = pipeline(&env).await.list().await.unwrap();
        assert!(files.iter().any(|f| f.name == SEED_PERIOD));
    }

    /// Lists an empty folder and rejects every upload.
    struct RejectingStore;

    #[async_trait::async_trait]
    impl Store for RejectingStore {
        async fn list(&self, _folder: &str) -> Result<Vec<RemoteFile>> {
            Ok(Vec::new())
        }

        async fn download(&self, name: &str, _folder: &str) -> Result<Vec<u8>> {
            Err(crate::Error::msg(ErrorType::NotFound, name.to_string()))
        }

        async fn upload(
            &self,
            _name: &str,
            local_path: &Path,
            _folder: &str,
            _existing_id: Option<&str>,
        ) -> Result<String> {
            assert!(local_path.is_file());
            Err(crate::Error::msg(ErrorType::Store, "quota exceeded"))
        }
    }

    #[tokio::test]
    async fn test_failed_upload_cleans_staging() {
        let env = TestEnv::new().await;
        let pipeline = Pipeline {
            config: env.config(),
            store: Box::new(RejectingStore),
        };
        let table = ExpenseTable::new([DESCRIPTION], Vec::new());
        let err = pipeline.persist("2026_november", &table).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
        assert!(err.to_string().contains("quota exceeded"));
        assert!(staging_is_empty(pipeline.config()).await);
    }
}
