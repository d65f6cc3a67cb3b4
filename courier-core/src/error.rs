//! Error types for courier-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or parsing the remote descriptor of a proxy file.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The proxy file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The first line is blank (or the file is empty).
    #[error("proxy file has no remote descriptor on its first line")]
    Empty,

    /// The first line is not a `scheme://[user[:password]@]host/path` URL.
    ///
    /// The offending text is deliberately not echoed: it may carry a password.
    #[error("malformed remote descriptor: {source}")]
    Malformed {
        #[source]
        source: url::ParseError,
    },

    /// A non-`file` descriptor without a host cannot be mounted.
    #[error("remote descriptor {descriptor} names no host")]
    MissingHost { descriptor: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DescriptorError {
    DescriptorError::Io {
        path: path.into(),
        source,
    }
}
