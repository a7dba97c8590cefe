//! The remote file store that holds the monthly expense spreadsheets.
//!
//! The `Store` trait is the seam between the pipeline and Google Drive. `DriveStore` talks to
//! Google, while `TestStore` keeps everything in memory so that the whole app can run without
//! network access.

mod drive;
mod files;
mod test_store;
mod token;

use crate::error::{ErrorType, IntoResult};
use crate::model::RemoteFile;
use crate::{Config, Result};
use anyhow::Context;
use drive::DriveStore;
use std::path::Path;
use token::TokenProvider;
use tracing::debug;

pub(crate) use test_store::TestStore;
#[cfg(test)]
pub(crate) use test_store::{StoredFile, SEED_PERIOD};

/// The OAuth scope requested for the service account.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Files in the store are Google Sheets.
pub(crate) const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Sheets are exported and uploaded as CSV.
const CSV_MIME: &str = "text/csv";

/// When this environment variable is set and non-empty, the in-memory store is used.
pub const TEST_MODE_ENV: &str = "EXPENSE_SYNC_IN_TEST_MODE";

/// Which `Store` implementation to use.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Use Google Drive.
    #[default]
    Google,
    /// Use the in-memory `TestStore`.
    Testing,
}

impl Mode {
    /// Returns `Mode::Testing` if `EXPENSE_SYNC_IN_TEST_MODE` is set to a non-empty value,
    /// otherwise `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// The operations the pipeline needs from the remote file store.
#[async_trait::async_trait]
pub(crate) trait Store {
    /// Lists every file in `folder`.
    async fn list(&self, folder: &str) -> Result<Vec<RemoteFile>>;

    /// Returns the CSV content of the sheet named `name` in `folder`. Fails with
    /// `ErrorType::NotFound` when there is no such sheet.
    async fn download(&self, name: &str, folder: &str) -> Result<Vec<u8>>;

    /// Uploads the CSV file at `local_path`. Creates a new sheet named `name` in `folder` when
    /// `existing_id` is `None`, otherwise replaces the content of `existing_id`. Returns the id.
    async fn upload(
        &self,
        name: &str,
        local_path: &Path,
        folder: &str,
        existing_id: Option<&str>,
    ) -> Result<String>;
}

/// Creates the `Store` for `mode`.
pub(crate) async fn store(config: &Config, mode: Mode) -> Result<Box<dyn Store + Send + Sync>> {
    match mode {
        Mode::Testing => {
            debug!("Using the in-memory store");
            Ok(Box::new(TestStore::new(config.folder_id())))
        }
        Mode::Google => {
            let key = files::read_service_account_key(&config.service_account_path())
                .await
                .pub_result(ErrorType::Config)?;
            debug!("Using Google Drive as {}", key.client_email);
            let tokens = TokenProvider::new(key)
                .await
                .pub_result(ErrorType::Config)?;
            let client = reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("Unable to create the HTTP client")
                .pub_result(ErrorType::Store)?;
            let drive = DriveStore::new(client, tokens).pub_result(ErrorType::Store)?;
            Ok(Box::new(drive))
        }
    }
}
