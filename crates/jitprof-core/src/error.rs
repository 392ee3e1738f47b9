//! Profiler error types

use thiserror::Error;

/// Errors raised while emitting a report.
///
/// The event path never fails; only the sink at the end of a run can.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing to the sink failed
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the report failed
    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink rejected the report
    #[error("report sink error: {0}")]
    Sink(String),
}

impl ReportError {
    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}
