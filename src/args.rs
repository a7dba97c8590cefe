//! These structs provide the CLI interface for the expenses CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expenses: Rolls monthly expense spreadsheets forward and reports on them.
///
/// Each month's expenses live in a Google Sheet named like `2026_october` inside one Google Drive
/// folder. This program creates next month's sheet from the expenses that carry over (fixed
/// expenses and unfinished installments such as `Notebook 03/10`), sums expenses per expense type
/// into a `<month>_report` sheet, and serves the same operations over HTTP.
///
/// You need a Google service account with access to the folder. Pass its JSON key to `init`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. You need:
    ///
    /// - The JSON key of a Google service account, passed as --service-account. Share the Drive
    ///   folder with the service account's email address.
    ///
    /// - The id of the Drive folder that holds the monthly sheets, passed as --folder-id. It is
    ///   the last segment of https://drive.google.com/drive/folders/<folder-id>.
    Init(InitArgs),
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Create next month's sheet from the expenses that carry over.
    Generate(DateArgs),
    /// Sum a month's expenses per expense type and save the report.
    Report(ReportArgs),
    /// Show a month's expenses with their installments.
    Current(DateArgs),
    /// List the files in the Drive folder.
    List,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and credentials are held. Defaults to ~/expenses
    #[arg(long, env = "EXPENSES_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `expenses init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The path to the service account JSON key. It will be copied into the data directory.
    #[arg(long)]
    service_account: PathBuf,

    /// The id of the Google Drive folder holding the monthly sheets.
    #[arg(long)]
    folder_id: String,
}

impl InitArgs {
    pub fn new(service_account: impl Into<PathBuf>, folder_id: impl Into<String>) -> Self {
        Self {
            service_account: service_account.into(),
            folder_id: folder_id.into(),
        }
    }

    pub fn service_account(&self) -> &Path {
        &self.service_account
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }
}

/// (Not shown): Args for the `expenses serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The address to listen on, e.g. 0.0.0.0:8000. Defaults to `bind` from config.json.
    #[arg(long)]
    bind: Option<String>,
}

impl ServeArgs {
    pub fn new(bind: Option<String>) -> Self {
        Self { bind }
    }

    pub fn bind(&self) -> Option<&str> {
        self.bind.as_deref()
    }
}

/// (Not shown): Args for commands that operate on one month.
#[derive(Debug, Parser, Clone)]
pub struct DateArgs {
    /// Any date in the month, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,
}

impl DateArgs {
    pub fn new(date: Option<String>) -> Self {
        Self { date }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

/// (Not shown): Args for the `expenses report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Any date in the month, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// Only include rows whose Person is exactly this.
    #[arg(long)]
    person: Option<String>,

    /// Only include rows whose Category is exactly this.
    #[arg(long)]
    category: Option<String>,

    /// Only include rows whose PaymentType is exactly this.
    #[arg(long)]
    payment_type: Option<String>,
}

impl ReportArgs {
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn person(&self) -> Option<&str> {
        self.person.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn payment_type(&self) -> Option<&str> {
        self.payment_type.as_deref()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expenses"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSES_HOME instead of relying on the default \
                directory. If you continue using the program right now, you may have problems!",
            );
            PathBuf::from("expenses")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_args() {
        let args = Args::try_parse_from([
            "expenses",
            "--home",
            "/tmp/x",
            "report",
            "--date",
            "2026-10-18",
            "--person",
            "Ana",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/x"));
        match args.command() {
            Command::Report(report) => {
                assert_eq!(report.date(), Some("2026-10-18"));
                assert_eq!(report.person(), Some("Ana"));
                assert_eq!(report.category(), None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_log_level() {
        let args =
            Args::try_parse_from(["expenses", "--log-level", "debug", "--home", "h", "list"])
                .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert!(matches!(args.command(), Command::List));
    }

    #[test]
    fn test_init_requires_folder() {
        assert!(Args::try_parse_from([
            "expenses",
            "init",
            "--service-account",
            "key.json"
        ])
        .is_err());
    }
}
