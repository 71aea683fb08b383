use bytes::Bytes;
use std::{io, process::ExitStatus};

/// A specialized [`Result`](std::result::Result) for decoding operations.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Errors surfaced by codecs and the adaptors driving them.
///
/// None of these are retried: decoding the same bytes again cannot succeed.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The accumulated input cannot be a valid prefix of the encoded format.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// End of input arrived while the codec still expected more bytes.
    #[error("input ended before the encoded stream was complete")]
    Truncated,

    /// The external process could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    SpawnFailed {
        /// Program that was launched.
        program: String,
        /// Underlying launch error.
        #[source]
        source: io::Error,
    },

    /// The external process exited unsuccessfully.
    ///
    /// `output` holds whatever was drained from the process after its input was closed, so
    /// decoded bytes are never dropped on a late failure. See [`CodecError::take_output`].
    #[error("process exited unsuccessfully ({status})")]
    ProcessFailed {
        /// Exit status reported by the operating system.
        status: ExitStatus,
        /// Output drained after the input pipe was closed.
        output: Bytes,
    },

    /// The adaptor already finished or failed and accepts no further calls.
    #[error("adaptor is closed")]
    Closed,

    /// I/O failure on a pipe or on the upstream source.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Moves out any decoded output carried by this error, leaving it empty.
    ///
    /// Only [`CodecError::ProcessFailed`] carries output; every other variant returns an empty
    /// buffer.
    pub fn take_output(&mut self) -> Bytes {
        match self {
            Self::ProcessFailed { output, .. } => std::mem::take(output),
            _ => Bytes::new(),
        }
    }

    pub(crate) fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }
}
