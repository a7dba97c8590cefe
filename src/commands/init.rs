use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `folder_id` along with default settings
/// - Copies `service_account` into its default location in the data dir.
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/expenses`
/// - `service_account` - The JSON key of a Google service account that can read and write the
///   folder. This will be copied to its default location in the data directory.
/// - `folder_id` - The id of the Google Drive folder holding the monthly expense sheets, the last
///   path segment of `https://drive.google.com/drive/folders/<folder_id>`.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path, service_account: &Path, folder_id: &str) -> Result<Out<()>> {
    let config = Config::create(home, service_account, folder_id)
        .await
        .map_err(|e| e.context("Unable to create the data directory and configs"))?;
    Ok(format!(
        "Successfully created the expenses directory at {}",
        config.root().display()
    )
    .into())
}
