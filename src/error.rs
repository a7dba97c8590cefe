//! Error types for the crate.
//!
//! Internally we use `anyhow` through the `Res<T>` alias. Anything that crosses the public
//! boundary (commands, the store seam, the HTTP surface) is converted to `Error`, which carries an
//! `ErrorType` so that callers can tell a missing file from a malformed spreadsheet.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure that occurred.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The requested period file does not exist in the store.
    NotFound,
    /// Tabular content or a currency value could not be parsed.
    Parse,
    /// A call to the remote store failed (network, auth, quota).
    Store,
    /// A caller-supplied parameter was malformed.
    Validation,
    /// The configuration or home directory is unusable.
    Config,
    /// The service itself failed to start or run.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type. The message is the full context chain of the underlying error.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    /// Wrap `inner` as an error of kind `error_type`.
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Create an error of kind `error_type` from a message.
    pub fn msg<M>(error_type: ErrorType, message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Adds context to the error while keeping its kind.
    pub fn context<C>(self, context: C) -> Self
    where
        C: Display + Send + Sync + 'static,
    {
        Self {
            error_type: self.error_type,
            inner: self.inner.context(context),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

/// Converts an internal result into a public `Result` by classifying its error.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
