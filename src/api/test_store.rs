//! Implements the `Store` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Drive.

use crate::api::{Store, SPREADSHEET_MIME};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Period, RemoteFile};
use crate::{utils, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::debug;

/// A file held by the `TestStore`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct StoredFile {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) content: Vec<u8>,
}

impl StoredFile {
    fn remote(&self) -> RemoteFile {
        RemoteFile {
            id: self.id.clone(),
            name: self.name.clone(),
            mime_type: SPREADSHEET_MIME.to_string(),
        }
    }
}

/// Folder contents, keyed by folder id. Shared by every `TestStore` so that state written by one
/// request can be read by the next, just like a real Drive folder.
static FOLDERS: LazyLock<Mutex<HashMap<String, Vec<StoredFile>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn folders() -> MutexGuard<'static, HashMap<String, Vec<StoredFile>>> {
    FOLDERS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An implementation of the `Store` trait that does not use Google Drive. A folder that has never
/// been seen before is seeded with sample expense sheets.
pub(crate) struct TestStore {
    folder: String,
}

impl TestStore {
    pub(crate) fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Returns the files currently held in this store's folder.
    pub(crate) fn get_state(&self) -> Vec<StoredFile> {
        let mut folders = folders();
        folders
            .entry(self.folder.clone())
            .or_insert_with(seed)
            .clone()
    }

    /// Replaces the files held in this store's folder.
    pub(crate) fn set_state(&self, files: Vec<StoredFile>) {
        folders().insert(self.folder.clone(), files);
    }

    fn check_folder(&self, folder: &str) -> Result<()> {
        if folder == self.folder {
            return Ok(());
        }
        Err(Error::msg(
            ErrorType::Store,
            format!("Folder '{folder}' is not accessible"),
        ))
    }
}

#[async_trait::async_trait]
impl Store for TestStore {
    async fn list(&self, folder: &str) -> Result<Vec<RemoteFile>> {
        self.check_folder(folder)?;
        Ok(self.get_state().iter().map(StoredFile::remote).collect())
    }

    async fn download(&self, name: &str, folder: &str) -> Result<Vec<u8>> {
        self.check_folder(folder)?;
        self.get_state()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.content)
            .ok_or_else(|| {
                Error::msg(
                    ErrorType::NotFound,
                    format!("No files found with the name '{name}' in the specified folder"),
                )
            })
    }

    async fn upload(
        &self,
        name: &str,
        local_path: &Path,
        folder: &str,
        existing_id: Option<&str>,
    ) -> Result<String> {
        self.check_folder(folder)?;
        let content = utils::read_bytes(local_path)
            .await
            .pub_result(ErrorType::Store)?;
        let mut files = self.get_state();
        let id = match existing_id {
            Some(id) => {
                let file = files.iter_mut().find(|f| f.id == id).ok_or_else(|| {
                    Error::msg(ErrorType::Store, format!("File not found: {id}"))
                })?;
                file.content = content;
                id.to_string()
            }
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                files.push(StoredFile {
                    id: id.clone(),
                    name: name.to_string(),
                    content,
                });
                id
            }
        };
        self.set_state(files);
        debug!("Stored '{name}' as {id}");
        Ok(id)
    }
}

/// The period whose sheet is always present in a freshly seeded folder.
pub(crate) const SEED_PERIOD: &str = "2025_october";

/// Provides the seed data from this module: the sample sheet under `SEED_PERIOD` and, so that
/// the app works without a `date`, under the current period too.
fn seed() -> Vec<StoredFile> {
    let mut names = vec![SEED_PERIOD.to_string()];
    let current = Period::current().key();
    if current != SEED_PERIOD {
        names.push(current);
    }
    names
        .into_iter()
        .enumerate()
        .map(|(ix, name)| StoredFile {
            id: format!("seed{ix:04}"),
            name,
            content: EXPENSE_DATA.as_bytes().to_vec(),
        })
        .collect()
}

/// Seed expense data.
pub(crate) const EXPENSE_DATA: &str = r##"Date,Description,Category,Amount,Person,PaymentType,ExpenseType
2025-10-01,Rent,Housing,"R$ 2.500,00",Ana,Transfer,Fixed
2025-10-02,Internet,Utilities,"R$ 119,90",Ana,Debit,Fixed
2025-10-03,Supermarket,Groceries,"R$ 843,17",Bruno,Credit,Variable
2025-10-05,Notebook 03/10,Electronics,"R$ 420,00",Bruno,Credit,Variable
2025-10-07,Sofa 12/12,Home,"R$ 310,50",Ana,Credit,Variable
2025-10-09,Gym,Health,"R$ 99,00",Bruno,Debit,Fixed
2025-10-12,Pharmacy,Health,"R$ 57,35",Ana,Debit,Variable
2025-10-15,Flight 01/06,Travel,"R$ 1.234,56",Ana,Credit,Variable
2025-10-18,Restaurant,Food,"R$ 186,40",Bruno,Credit,Variable
2025-10-21,Phone 10/10,Electronics,"R$ 250,00",Bruno,Credit,Variable
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn folder() -> String {
        format!("test-{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn test_seeded_folder() {
        let folder = folder();
        let store = TestStore::new(&folder);
        let files = store.list(&folder).await.unwrap();
        assert!(files.iter().any(|f| f.name == SEED_PERIOD));
        assert!(files.iter().all(|f| f.mime_type == SPREADSHEET_MIME));
        let content = store.download(SEED_PERIOD, &folder).await.unwrap();
        assert_eq!(content, EXPENSE_DATA.as_bytes());
    }

    #[tokio::test]
    async fn test_download_missing() {
        let folder = folder();
        let store = TestStore::new(&folder);
        let err = store.download("1999_january", &folder).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        assert!(err.to_string().contains("1999_january"));
    }

    #[tokio::test]
    async fn test_upload_create_then_overwrite() {
        let folder = folder();
        let store = TestStore::new(&folder);
        store.set_state(Vec::new());
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.csv");

        utils::write(&path, "A\n1\n").await.unwrap();
        let id = store.upload("x", &path, &folder, None).await.unwrap();
        utils::write(&path, "A\n2\n").await.unwrap();
        let same = store.upload("x", &path, &folder, Some(&id)).await.unwrap();

        assert_eq!(id, same);
        let state = store.get_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].content, b"A\n2\n");
    }

    #[tokio::test]
    async fn test_upload_unknown_id() {
        let folder = folder();
        let store = TestStore::new(&folder);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.csv");
        utils::write(&path, "A\n1\n").await.unwrap();
        let err = store
            .upload("x", &path, &folder, Some("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
    }

    #[tokio::test]
    async fn test_wrong_folder() {
        let store = TestStore::new(folder());
        let err = store.list("someone-else").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
    }
}
