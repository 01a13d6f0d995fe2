#![forbid(unsafe_code)]

//! Shape checks for targets, event types, and listeners.
//!
//! The `assert_*` functions run before any mutation so a rejected call
//! leaves both sides of a would-be linkage untouched.

use evbus_core::{EventType, Listener};

use crate::error::EventedError;
use crate::options::Operations;
use crate::target::Target;

/// An object counts as capability-bearing when it exposes `on|one|off|trigger`.
#[must_use]
pub fn is_capability_bearing(surface: Operations) -> bool {
    surface.contains(Operations::CORE)
}

#[must_use]
pub fn is_valid_target(target: &Target) -> bool {
    match target {
        Target::Native(_) => true,
        Target::Evented { surface, .. } => is_capability_bearing(*surface),
    }
}

#[must_use]
pub fn is_valid_type(event_type: &EventType) -> bool {
    event_type.is_valid()
}

pub fn assert_target(target: &Target, op: &'static str) -> Result<(), EventedError> {
    if is_valid_target(target) {
        Ok(())
    } else {
        Err(EventedError::InvalidTarget { op })
    }
}

/// `None` stands for a type that was required but not given.
pub fn assert_type(event_type: Option<&EventType>, op: &'static str) -> Result<(), EventedError> {
    match event_type {
        Some(ty) if is_valid_type(ty) => Ok(()),
        Some(ty) => Err(EventedError::InvalidEventType {
            op,
            found: ty.to_string(),
        }),
        None => Err(EventedError::InvalidEventType {
            op,
            found: "nothing".to_string(),
        }),
    }
}

pub fn assert_listener(listener: Option<&Listener>, op: &'static str) -> Result<(), EventedError> {
    match listener {
        Some(_) => Ok(()),
        None => Err(EventedError::InvalidListener { op }),
    }
}
