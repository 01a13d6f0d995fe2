#![forbid(unsafe_code)]

//! Event types, pre-built events, and the delivered event record.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::slice;

use serde_json::{Map, Value};

use crate::handle::BusHandle;

/// Event type fired when an object is torn down.
///
/// Firing it on a handle runs that handle's teardown hooks after the
/// listeners have seen the event.
pub const DISPOSE: &str = "dispose";

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// One event name, or an ordered list of names.
///
/// Construction never fails; validity is checked separately with
/// [`EventType::is_valid`] so callers can report it as an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Single(String),
    Many(Vec<String>),
}

impl EventType {
    /// The names in order. A single type yields a one-element slice.
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::Single(name) => slice::from_ref(name),
            Self::Many(names) => names,
        }
    }

    /// Non-blank string, or a non-empty list of non-blank strings.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Single(name) => is_non_blank(name),
            Self::Many(names) => !names.is_empty() && names.iter().all(|n| is_non_blank(n)),
        }
    }

    /// Whether `name` is one of the listed types.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }
}

#[inline]
fn is_non_blank(name: &str) -> bool {
    !name.trim().is_empty()
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => write!(f, "{name:?}"),
            Self::Many(names) => write!(f, "{names:?}"),
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::Single(name.to_owned())
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::Single(name)
    }
}

impl From<&String> for EventType {
    fn from(name: &String) -> Self {
        Self::Single(name.clone())
    }
}

impl From<Vec<String>> for EventType {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<Vec<&str>> for EventType {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for EventType {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventType {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

// ---------------------------------------------------------------------------
// EventInit
// ---------------------------------------------------------------------------

/// A pre-built event that has not been fired yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventInit {
    pub event_type: String,
    pub data: Map<String, Value>,
}

impl EventInit {
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: Map::new(),
        }
    }

    /// Attach one data field.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for EventInit {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

impl From<String> for EventInit {
    fn from(event_type: String) -> Self {
        Self::new(event_type)
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The record delivered to listeners.
///
/// `target` is the handle the event was fired on. `receiver` is the handle
/// of the object the current listener is bound to; it changes from one
/// listener to the next within a single dispatch.
pub struct Event {
    event_type: String,
    target: BusHandle,
    data: Map<String, Value>,
    receiver: RefCell<Option<BusHandle>>,
    default_prevented: Cell<bool>,
    immediate_stopped: Cell<bool>,
}

impl Event {
    pub(crate) fn new(init: EventInit, target: BusHandle) -> Self {
        Self {
            event_type: init.event_type,
            target,
            data: init.data,
            receiver: RefCell::new(None),
            default_prevented: Cell::new(false),
            immediate_stopped: Cell::new(false),
        }
    }

    /// Fold a caller-supplied hash into the data; hash keys win.
    pub(crate) fn merge(&mut self, hash: Map<String, Value>) {
        self.data.extend(hash);
    }

    pub(crate) fn set_receiver(&self, receiver: Option<BusHandle>) {
        *self.receiver.borrow_mut() = receiver;
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Handle the event was fired on.
    #[must_use]
    pub fn target(&self) -> &BusHandle {
        &self.target
    }

    /// Handle of the object the running listener is bound to.
    #[must_use]
    pub fn receiver(&self) -> Option<BusHandle> {
        self.receiver.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Shorthand for `data().get(key)`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Skip every listener after the current one in this dispatch.
    pub fn stop_immediate_propagation(&self) {
        self.immediate_stopped.set(true);
    }

    #[must_use]
    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("target", &self.target.id())
            .field("data", &self.data)
            .field("default_prevented", &self.default_prevented.get())
            .finish_non_exhaustive()
    }
}
