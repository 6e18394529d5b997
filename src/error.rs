use std::io;
use thiserror::Error;

/// Custom error types for the linestream library.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying sink rejected a write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line flush failed while processing a `write` call.
    ///
    /// `consumed` counts the input bytes taken before the terminator whose
    /// flush failed. The pending line is kept, so resuming the write at
    /// `&input[consumed..]` retries the flush without losing data. When the
    /// source is `PartialWrite` the sink already owns the line and `consumed`
    /// includes its terminator.
    #[error("line flush failed after consuming {consumed} input bytes: {source}")]
    Flush {
        consumed: usize,
        #[source]
        source: Box<Error>,
    },

    /// The destination took the first `written` bytes of a line, then failed.
    ///
    /// The line no longer belongs to the producer: the shared sink holds the
    /// unsent remainder and completes it before any other payload reaches the
    /// destination.
    #[error("sink accepted {written} bytes of a line before failing: {source}")]
    PartialWrite {
        written: usize,
        #[source]
        source: io::Error,
    },

    /// A write or close call reached a writer that was already closed.
    #[error("writer is closed")]
    WriterClosed,

    /// A write reached a shared sink after it was shut down.
    #[error("sink has been shut down")]
    SinkClosed,

    /// A line exceeded the limit enforced by a bounded sink.
    #[error("line of {len} bytes exceeds limit of {limit} bytes")]
    LineTooLong { len: usize, limit: usize },

    /// A configuration value could not be applied.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// One or more writers failed while a group was closing.
    #[error("{} failure(s) while closing writer group: {}", .0.len(), join(.0))]
    GroupClose(Vec<Error>),
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a new `Flush` error wrapping the sink failure.
    pub fn flush(consumed: usize, source: Error) -> Self {
        Self::Flush {
            consumed,
            source: Box::new(source),
        }
    }

    /// Create a new `InvalidConfig` error with a descriptive message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Number of input bytes consumed before a failed flush, if this error
    /// came out of a `write` call.
    pub fn consumed(&self) -> Option<usize> {
        match self {
            Self::Flush { consumed, .. } => Some(*consumed),
            _ => None,
        }
    }

    /// True when the sink took custody of the line despite the failure, so
    /// the producer must not send it again.
    pub fn line_accepted(&self) -> bool {
        match self {
            Self::PartialWrite { .. } => true,
            Self::Flush { source, .. } => source.line_accepted(),
            _ => false,
        }
    }

    /// The individual failures behind a `GroupClose` error.
    pub fn failures(&self) -> &[Error] {
        match self {
            Self::GroupClose(errors) => errors,
            _ => std::slice::from_ref(self),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Flush { source, .. } => (*source).into(),
            Error::PartialWrite { source, .. } => source,
            err @ (Error::WriterClosed | Error::SinkClosed) => {
                io::Error::new(io::ErrorKind::BrokenPipe, err)
            }
            err @ (Error::LineTooLong { .. } | Error::InvalidConfig { .. }) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            err => io::Error::other(err),
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
