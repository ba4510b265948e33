//! Unified error type.

use std::fmt;

/// Boxed error produced by a downstream handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by the crate's fallible operations.
///
/// The middleware itself never fails an exchange. Everything here is either
/// a construction-time problem (a header name that HTTP cannot carry, a
/// config document that does not parse) or a failure owned by someone else
/// and handed back untouched.
#[derive(Debug)]
pub enum Error {
    /// A configured header name is empty or contains illegal characters.
    InvalidHeaderName {
        name: String,
        source: http::header::InvalidHeaderName,
    },
    /// The JSON configuration document could not be decoded.
    Config(serde_json::Error),
    /// Binding or accepting on the host listener failed.
    Io(std::io::Error),
    /// A downstream handler failed while serving an exchange.
    Handler(BoxError),
}

impl Error {
    /// Wraps a downstream failure so it can travel through [`Handler`](crate::Handler).
    pub fn handler(e: impl Into<BoxError>) -> Self {
        Self::Handler(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeaderName { name, .. } => write!(f, "invalid header name `{name}`"),
            Self::Config(e)  => write!(f, "config: {e}"),
            Self::Io(e)      => write!(f, "io: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidHeaderName { source, .. } => Some(source),
            Self::Config(e)  => Some(e),
            Self::Io(e)      => Some(e),
            Self::Handler(e) => Some(&**e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}
