//! Command handlers for the expenses CLI and HTTP service.
//!
//! Each use case is implemented once here and called from both the CLI subcommands and the HTTP
//! handlers.

mod current;
mod generate;
mod init;
mod report;

use crate::error::{ErrorType, IntoResult};
use crate::model::{parse_date, Period};
use crate::Result;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use current::{current, list};
pub use generate::generate;
pub use init::init;
pub use report::report;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and HTTP interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Splits the output into its message and structured data.
    pub fn into_parts(self) -> (String, Option<T>) {
        (self.message, self.structure)
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// The period containing `date` (`YYYY-MM-DD`), or the current period when no date is given.
fn period_for(date: Option<&str>) -> Result<Period> {
    match date {
        None => Ok(Period::current()),
        Some(date) => parse_date(date)
            .map(Period::from_date)
            .pub_result(ErrorType::Validation),
    }
}
