//! Relay error definitions.

use std::time::Duration;
use thiserror::Error;

/// Which end of a transfer an I/O error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySide {
    /// Reading raw bytes from the producer.
    Source,
    /// Writing compressed bytes towards the consumer.
    Sink,
}

impl std::fmt::Display for CopySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopySide::Source => f.write_str("source"),
            CopySide::Sink => f.write_str("sink"),
        }
    }
}

/// Errors that can end a transfer.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The admission queue was at capacity when the producer arrived.
    #[error("server is overwhelmed")]
    Overwhelmed,

    /// The codec could not be constructed.
    #[error("failed to create encoder: {0}")]
    EncoderInit(String),

    /// An I/O error interrupted the byte copy.
    #[error("copy failed on {side}: {source}")]
    Copy {
        side: CopySide,
        #[source]
        source: std::io::Error,
    },

    /// No consumer claimed the stream in time.
    #[error("stream was not claimed within {0:?}")]
    Unclaimed(Duration),
}

impl RelayError {
    pub(crate) fn source_io(source: std::io::Error) -> Self {
        RelayError::Copy {
            side: CopySide::Source,
            source,
        }
    }

    pub(crate) fn sink_io(source: std::io::Error) -> Self {
        RelayError::Copy {
            side: CopySide::Sink,
            source,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Overwhelmed => "overwhelmed",
            RelayError::EncoderInit(_) => "encoder_init",
            RelayError::Copy {
                side: CopySide::Source,
                ..
            } => "source_copy",
            RelayError::Copy {
                side: CopySide::Sink,
                ..
            } => "sink_copy",
            RelayError::Unclaimed(_) => "unclaimed",
        }
    }
}

/// A consumer stopped waiting before any stream was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait for a stream was cancelled")]
pub struct Cancelled;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
