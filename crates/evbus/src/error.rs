#![forbid(unsafe_code)]

//! Caller-facing errors.
//!
//! Every variant signals a mistake at the call site. They are returned
//! before any listener table or hook list is touched, and nothing retries
//! them.

use std::fmt;

/// Errors from the evented surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventedError {
    /// Target is neither a bus handle nor a capability-bearing object.
    InvalidTarget { op: &'static str },
    /// Type is missing, blank, an empty list, or a list with a blank entry.
    InvalidEventType { op: &'static str, found: String },
    /// Listener is missing where one is required.
    InvalidListener { op: &'static str },
    /// `event_bus_key` does not name a handle slot on the host.
    InvalidEventBusKey { key: String },
    /// The operation was excluded when the capability was attached.
    OperationExcluded { op: &'static str },
}

impl fmt::Display for EventedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget { op } => write!(
                f,
                "invalid target for #{op}; must be a bus handle or evented object"
            ),
            Self::InvalidEventType { op, found } => write!(
                f,
                "invalid event type for #{op}; must be a non-empty string or list, got {found}"
            ),
            Self::InvalidListener { op } => {
                write!(f, "invalid listener for #{op}; a listener is required")
            }
            Self::InvalidEventBusKey { key } => write!(
                f,
                "the event bus key {key:?} does not refer to a bus handle on the host"
            ),
            Self::OperationExcluded { op } => {
                write!(f, "#{op} was excluded when the capability was attached")
            }
        }
    }
}

impl std::error::Error for EventedError {}

/// Attach-option parse error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl OptionsError {
    pub(crate) fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for OptionsError {}
