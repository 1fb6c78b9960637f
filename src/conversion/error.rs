//! Closed set of conversion failure kinds.

use std::path::PathBuf;

/// Failure category, for callers that branch on what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The inspection tool failed; the file is treated as needing conversion.
    ProbeFailure,
    /// The encoder could not be spawned or its pipes attached.
    ProcessStartFailure,
    /// Copying encoder output to the client failed.
    StreamingFailure,
    /// The encoder exited unsuccessfully or was stopped.
    ProcessExitFailure,
}

/// Errors raised while probing, starting, or streaming a conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("probe failed for {}: {source}", path.display())]
    ProbeFailure {
        path: PathBuf,
        #[source]
        source: stromboli_av::Error,
    },

    #[error("failed to start {tool}: {message}")]
    ProcessStartFailure { tool: String, message: String },

    #[error("streaming failed after {bytes} bytes: {message}")]
    StreamingFailure { bytes: u64, message: String },

    #[error("conversion did not finish: {reason}")]
    ProcessExitFailure { reason: String },
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::ProbeFailure { .. } => ErrorKind::ProbeFailure,
            ConversionError::ProcessStartFailure { .. } => ErrorKind::ProcessStartFailure,
            ConversionError::StreamingFailure { .. } => ErrorKind::StreamingFailure,
            ConversionError::ProcessExitFailure { .. } => ErrorKind::ProcessExitFailure,
        }
    }

    pub(crate) fn start_failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessStartFailure {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub(crate) fn exit_failure(reason: impl Into<String>) -> Self {
        Self::ProcessExitFailure {
            reason: reason.into(),
        }
    }
}
