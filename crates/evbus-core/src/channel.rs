#![forbid(unsafe_code)]

//! Channel primitive: register, unregister, and fire on a [`BusHandle`].
//!
//! # Dispatch
//!
//! `fire` snapshots the entries for the event's type, releases the table
//! borrow, then walks the snapshot in registration order. Before each call
//! it re-checks that the entry is still registered, so a listener removed by
//! an earlier listener in the same dispatch is skipped. Entries added during
//! a dispatch are not part of its snapshot.
//!
//! An entry whose receiver has been dropped is pruned instead of invoked.
//!
//! # Identity
//!
//! Removal matches on [`ListenerId`], never on the callable itself. A wrapper
//! built with [`crate::Listener::wrap`] is therefore removed by the listener
//! it wraps.
//!
//! # Failure Modes
//!
//! - **Panicking listener**: the panic propagates to the caller of `fire`.
//!   Entries already consumed (`Once`) stay removed.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::event::{DISPOSE, Event, EventInit};
use crate::handle::BusHandle;
use crate::listener::{BoundListener, ListenerId};

/// How long a registration lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Stays until removed.
    #[default]
    Persistent,
    /// Removed just before its first invocation.
    Once,
}

/// Identity of a single registration within one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

/// Outcome of a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// Listeners actually invoked.
    pub invoked: usize,
    pub default_prevented: bool,
}

impl Dispatch {
    /// `true` unless a listener called [`Event::prevent_default`].
    #[must_use]
    pub fn proceed(&self) -> bool {
        !self.default_prevented
    }
}

// ---------------------------------------------------------------------------
// Listener table
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Entry {
    id: EntryId,
    /// Entries sharing a group are consumed together (`any`).
    group: EntryId,
    consume: bool,
    listener: BoundListener,
}

#[derive(Default)]
pub(crate) struct ListenerTable {
    by_type: HashMap<String, Vec<Entry>>,
    next_entry: u64,
}

impl ListenerTable {
    fn next_id(&mut self) -> EntryId {
        self.next_entry += 1;
        EntryId(self.next_entry)
    }

    fn push(&mut self, event_type: &str, entry: Entry) {
        self.by_type
            .entry(event_type.to_owned())
            .or_default()
            .push(entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub(crate) fn len_for(&self, event_type: &str) -> usize {
        self.by_type.get(event_type).map_or(0, Vec::len)
    }

    pub(crate) fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }

    fn snapshot(&self, event_type: &str) -> Vec<Entry> {
        self.by_type.get(event_type).cloned().unwrap_or_default()
    }

    fn contains(&self, event_type: &str, id: EntryId) -> bool {
        self.by_type
            .get(event_type)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    fn remove_group(&mut self, group: EntryId) -> usize {
        self.remove_where(None, |e| e.group == group)
    }

    fn remove_where(&mut self, event_type: Option<&str>, pred: impl Fn(&Entry) -> bool) -> usize {
        let mut removed = 0;
        self.by_type.retain(|ty, entries| {
            if event_type.is_none_or(|wanted| wanted == ty.as_str()) {
                let before = entries.len();
                entries.retain(|e| !pred(e));
                removed += before - entries.len();
            }
            !entries.is_empty()
        });
        removed
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register `listener` for one type.
pub fn register(
    handle: &BusHandle,
    event_type: &str,
    listener: BoundListener,
    mode: DispatchMode,
) -> EntryId {
    let mut table = handle.table().borrow_mut();
    let id = table.next_id();
    trace!(handle = %handle.id(), event_type, listener = %listener.id(), ?mode, "register");
    table.push(
        event_type,
        Entry {
            id,
            group: id,
            consume: mode == DispatchMode::Once,
            listener,
        },
    );
    id
}

/// Register `listener` once across several types: the first of them to fire
/// consumes the registration for all of them.
pub fn register_any(handle: &BusHandle, event_types: &[String], listener: BoundListener) -> EntryId {
    let mut table = handle.table().borrow_mut();
    let group = table.next_id();
    trace!(handle = %handle.id(), types = ?event_types, listener = %listener.id(), "register any");
    for event_type in event_types {
        let id = table.next_id();
        table.push(
            event_type,
            Entry {
                id,
                group,
                consume: true,
                listener: listener.clone(),
            },
        );
    }
    group
}

/// Remove registrations. `None` is a wildcard at that level:
///
/// | `event_type` | `listener` | removes                           |
/// |--------------|------------|-----------------------------------|
/// | `None`       | `None`     | everything                        |
/// | `Some(t)`    | `None`     | everything registered for `t`     |
/// | `Some(t)`    | `Some(id)` | entries for `t` with identity `id`|
/// | `None`       | `Some(id)` | entries with identity `id`        |
///
/// Returns the number of entries removed.
pub fn unregister(handle: &BusHandle, event_type: Option<&str>, listener: Option<ListenerId>) -> usize {
    let removed = handle
        .table()
        .borrow_mut()
        .remove_where(event_type, |e| listener.is_none_or(|id| e.listener.id() == id));
    if removed > 0 {
        trace!(
            handle = %handle.id(),
            event_type = event_type.unwrap_or("*"),
            listener = ?listener,
            removed,
            "unregister"
        );
    }
    removed
}

/// Fire an event on `handle`, merging `hash` into its data.
///
/// Firing [`DISPOSE`] runs the handle's teardown hooks after delivery.
pub fn fire(handle: &BusHandle, init: impl Into<EventInit>, hash: Option<Map<String, Value>>) -> Dispatch {
    let mut event = Event::new(init.into(), handle.clone());
    if let Some(hash) = hash {
        event.merge(hash);
    }
    let event_type = event.event_type().to_owned();
    let snapshot = handle.table().borrow().snapshot(&event_type);
    trace!(handle = %handle.id(), event_type = %event_type, listeners = snapshot.len(), "fire");

    let mut invoked = 0;
    for entry in snapshot {
        let receiver = entry.listener.receiver();
        {
            let mut table = handle.table().borrow_mut();
            if !table.contains(&event_type, entry.id) {
                continue;
            }
            if receiver.is_none() {
                table.remove_where(None, |e| e.id == entry.id);
                continue;
            }
            if entry.consume {
                table.remove_group(entry.group);
            }
        }
        event.set_receiver(receiver);
        entry.listener.call(&event);
        invoked += 1;
        if event.is_immediate_propagation_stopped() {
            break;
        }
    }
    event.set_receiver(None);

    if event_type == DISPOSE {
        handle.run_teardown();
    }

    Dispatch {
        invoked,
        default_prevented: event.default_prevented(),
    }
}
