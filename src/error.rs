use std::fmt;

/// Errors raised *before* any delivery I/O begins.
///
/// Transport failures are never surfaced through this type; they are
/// classified into a [`DeliveryOutcome`] and routed to the hooks.
#[derive(Debug)]
pub enum DispatchError {
    /// The subscription secret is not exactly 64 characters.
    InvalidSecret { length: usize },

    /// The queue has been closed; no further work is accepted.
    QueueClosed,

    /// A bounded queue is full and the overflow policy rejects new work.
    /// Caller must retry or apply backoff.
    Backpressure,

    /// The delivery body could not be serialized.
    Serialization(serde_json::Error),

    /// The external subscription store reported a failure.
    Store(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidSecret { length } => {
                write!(f, "secret must be exactly 64 characters, got {length}")
            }
            DispatchError::QueueClosed => write!(f, "dispatch queue is closed"),
            DispatchError::Backpressure => write!(f, "dispatch queue at capacity"),
            DispatchError::Serialization(err) => write!(f, "body serialization failed: {err}"),
            DispatchError::Store(msg) => write!(f, "subscription store error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err)
    }
}

/// Final classification of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Subscriber acknowledged with 2xx.
    Delivered,

    /// Subscriber answered 404 or 410; it no longer wants delivery.
    TargetGone,

    /// Any other status, or a transport failure.
    Failed(FailureReason),
}

/// Reasons why an HTTP delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Network,
    /// Subscriber answered with a non-2xx, non-404/410 status.
    Status(u16),
    /// The send was cancelled by shutdown before completing.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "request timed out"),
            FailureReason::Network => write!(f, "network error"),
            FailureReason::Status(code) => write!(f, "subscriber returned status {code}"),
            FailureReason::Cancelled => write!(f, "send cancelled by shutdown"),
        }
    }
}
