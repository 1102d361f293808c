use std::fmt;
use std::time::Duration;

/// Reason a bridged request produced no result.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The driver reported a non-success status.
    Failed { what: &'static str, reason: String },
    /// No completion was observed within the policy timeout.
    TimedOut { what: &'static str, waited: Duration },
    /// The completion handle was dropped without being completed.
    Abandoned { what: &'static str },
    /// Draining driver events failed.
    Pump { what: &'static str, reason: String },
}

impl RequestError {
    /// Name of the request that failed (e.g. `"adapter"`).
    pub fn what(&self) -> &'static str {
        match self {
            Self::Failed { what, .. }
            | Self::TimedOut { what, .. }
            | Self::Abandoned { what }
            | Self::Pump { what, .. } => what,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { what, reason } => write!(f, "{what} request failed: {reason}"),
            Self::TimedOut { what, waited } => {
                write!(f, "{what} request did not complete within {waited:?}")
            }
            Self::Abandoned { what } => {
                write!(f, "{what} request was dropped by the driver without completing")
            }
            Self::Pump { what, reason } => {
                write!(f, "event processing failed while waiting for {what}: {reason}")
            }
        }
    }
}

impl std::error::Error for RequestError {}
