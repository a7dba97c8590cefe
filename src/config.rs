//! Configuration file handling.
//!
//! The configuration file is stored at `$EXPENSES_HOME/config.json` and contains the Google Drive
//! folder holding the expense sheets, the address the service binds to, and the path to the
//! service account key.

use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "expenses";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const STAGING: &str = ".staging";
const SERVICE_ACCOUNT_JSON: &str = "service_account.json";
const CONFIG_JSON: &str = "config.json";
const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EXPENSES_HOME` and from there it loads `$EXPENSES_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    staging: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory, its subdirectories and:
    /// - Creates an initial `config.json` file using `folder_id` along with default settings
    /// - Copies `service_account` into its default location in the data dir.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/expenses`
    /// - `service_account` - The JSON key downloaded for the Google service account that has
    ///   access to the folder.
    /// - `folder_id` - The id of the Google Drive folder holding the monthly expense sheets.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(
        dir: impl Into<PathBuf>,
        service_account: &Path,
        folder_id: &str,
    ) -> Result<Self> {
        Self::create_home(dir.into(), service_account, folder_id)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_home(
        maybe_relative: PathBuf,
        service_account: &Path,
        folder_id: &str,
    ) -> Res<Self> {
        if folder_id.trim().is_empty() {
            bail!("The Google Drive folder id cannot be empty");
        }

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the expenses home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let staging = root.join(STAGING);
        utils::make_dir(&staging).await?;

        let key_destination = secrets.join(SERVICE_ACCOUNT_JSON);
        utils::copy(service_account, &key_destination).await?;
        utils::restrict_permissions(&key_destination)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            folder_id: folder_id.trim().to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            staging,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets and staging directories exist
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_home(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_home(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The expenses home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            staging: root.join(STAGING),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        if !config.staging.is_dir() {
            bail!(
                "The staging directory is missing '{}'",
                config.staging.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// Where CSV files are written before they are uploaded.
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn folder_id(&self) -> &str {
        &self.config_file.folder_id
    }

    pub fn bind(&self) -> &str {
        &self.config_file.bind
    }

    /// When true, every failure is reported to HTTP callers as a 500.
    pub fn uniform_error_status(&self) -> bool {
        self.config_file.uniform_error_status
    }

    #[cfg(test)]
    pub(crate) fn set_uniform_error_status(&mut self, uniform: bool) {
        self.config_file.uniform_error_status = uniform;
    }

    /// Returns the stored `service_account_path` if it is absolute, otherwise resolves the
    /// relative path against the home directory.
    pub fn service_account_path(&self) -> PathBuf {
        let p = self.config_file.service_account_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expenses",
///   "config_version": 1,
///   "folder_id": "1Ab2Cd3Ef4Gh5Ij6Kl7Mn8Op9Qr",
///   "bind": "127.0.0.1:8000",
///   "uniform_error_status": false,
///   "service_account_path": ".secrets/service_account.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "expenses"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The Google Drive folder holding the expense sheets
    folder_id: String,

    /// Address for the HTTP service
    #[serde(default = "default_bind")]
    bind: String,

    #[serde(default)]
    uniform_error_status: bool,

    /// Path to the service account key (optional, relative to the home directory or absolute)
    /// Defaults to $EXPENSES_HOME/.secrets/service_account.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_account_path: Option<PathBuf>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            folder_id: String::new(),
            bind: default_bind(),
            uniform_error_status: false,
            service_account_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            !config.folder_id.trim().is_empty(),
            "The config file has an empty folder_id"
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn service_account_path(&self) -> PathBuf {
        self.service_account_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(SERVICE_ACCOUNT_JSON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("expenses_home");
        let key_source = dir.path().join("key.json");
        utils::write(&key_source, "{\"type\": \"service_account\"}")
            .await
            .unwrap();

        let config = Config::create(&home_dir, &key_source, " folder123 ")
            .await
            .unwrap();

        assert_eq!("folder123", config.folder_id());
        assert_eq!(DEFAULT_BIND, config.bind());
        assert!(!config.uniform_error_status());
        assert!(config.secrets().is_dir());
        assert!(config.staging().is_dir());
        assert!(config.config_path().is_file());
        let copied = utils::read(&config.service_account_path()).await.unwrap();
        assert_eq!("{\"type\": \"service_account\"}", copied);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(config.service_account_path())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.folder_id(), "folder123");
        assert_eq!(loaded.root(), config.root());
    }

    #[tokio::test]
    async fn test_config_create_empty_folder() {
        let dir = TempDir::new().unwrap();
        let key_source = dir.path().join("key.json");
        utils::write(&key_source, "{}").await.unwrap();
        assert!(Config::create(dir.path().join("h"), &key_source, "  ")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_staging() {
        let dir = TempDir::new().unwrap();
        let key_source = dir.path().join("key.json");
        utils::write(&key_source, "{}").await.unwrap();
        let config = Config::create(dir.path().join("h"), &key_source, "f")
            .await
            .unwrap();
        tokio::fs::remove_dir(config.staging()).await.unwrap();
        let err = Config::load(config.root()).await.unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "expenses",
            "config_version": 1,
            "folder_id": "minimal"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.folder_id, "minimal");
        assert_eq!(config.bind, DEFAULT_BIND);
        assert!(!config.uniform_error_status);
        assert_eq!(
            config.service_account_path(),
            PathBuf::from(SECRETS).join(SERVICE_ACCOUNT_JSON)
        );
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "budget-tracker",
            "config_version": 1,
            "folder_id": "abc"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let original = ConfigFile {
            folder_id: "abc".into(),
            bind: "0.0.0.0:9000".into(),
            uniform_error_status: true,
            service_account_path: Some(PathBuf::from("/etc/expenses/key.json")),
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        let loaded = ConfigFile::load(&path).await.unwrap();
        assert_eq!(original, loaded);
        assert_eq!(
            loaded.service_account_path(),
            PathBuf::from("/etc/expenses/key.json")
        );
    }

    #[test]
    fn test_serialization_omits_default_key_path() {
        let config = ConfigFile {
            folder_id: "abc".into(),
            ..ConfigFile::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("service_account_path"));
    }
}
