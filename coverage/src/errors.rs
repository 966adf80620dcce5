use std::{error, fmt, io, result};

/// A type alias for `Result<T, coverage::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur while synthesizing, loading or aggregating
/// coverage data.
#[derive(Debug)]
pub struct Error {
    inner: ErrorKind,
}

impl Error {
    pub fn new(k: ErrorKind) -> Self {
        Error { inner: k }
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::new(ErrorKind::InvalidArgument(msg.into()))
    }

    /// Return the kind of this Error.
    pub fn kind(&self) -> &ErrorKind {
        &self.inner
    }

    /// Unwrap this error into its underlying kind.
    pub fn into_kind(self) -> ErrorKind {
        self.inner
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.inner, ErrorKind::InvalidArgument(_))
    }
}

/// The specific type of Error.
#[derive(Debug)]
pub enum ErrorKind {
    /// Malformed or out-of-range configuration
    InvalidArgument(String),
    /// A table row that parsed but violates the data model
    InvalidRow { line: u64, message: String },
    /// CSV syntax or deserialization error
    Csv(csv::Error),
    /// I/O error while reading or writing a table
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ErrorKind::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            ErrorKind::InvalidRow { line, message } => {
                write!(f, "invalid row at line {line}: {message}")
            }
            ErrorKind::Csv(err) => write!(f, "CSV error: {err}"),
            ErrorKind::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.inner {
            ErrorKind::Csv(err) => Some(err),
            ErrorKind::Io(err) => Some(err),
            ErrorKind::InvalidArgument(_) | ErrorKind::InvalidRow { .. } => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::new(ErrorKind::Csv(err))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(ErrorKind::Io(err))
    }
}
