#![forbid(unsafe_code)]

//! The attached capability state and the logic behind each operation.
//!
//! [`EventBus`] is what [`attach`] returns and what a host embeds. It owns
//! the host's bus handle, the surface it was attached with, and the table
//! of cross-object linkages. The [`crate::Evented`] trait is a thin,
//! surface-checked front over the `pub(crate)` methods here.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use evbus_core::{BusHandle, DispatchMode, EventInit, EventType, Listener, ListenerId, WeakHandle, channel};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::EventedError;
use crate::linkage::{self, LinkTable};
use crate::normalize::{ListenArgs, OffArgs, OffPlan, normalize_listen, normalize_off};
use crate::options::{AttachOptions, HandleSlots, Operations};
use crate::validate::{assert_type, is_capability_bearing};

/// Attach the evented capability for `host`.
///
/// With `options.event_bus_key` set, the host's handle stored under that key
/// is adopted; otherwise a fresh handle is created. Either way a teardown
/// hook that removes all of the object's own listeners is installed on it.
pub fn attach<H: HandleSlots + ?Sized>(host: &H, options: AttachOptions) -> Result<EventBus, EventedError> {
    let handle = match &options.event_bus_key {
        Some(key) => host
            .handle_slot(key)
            .ok_or_else(|| EventedError::InvalidEventBusKey { key: key.clone() })?,
        None => BusHandle::new(),
    };
    Ok(EventBus::install(handle, options.surface()))
}

/// Evented capability state: bus handle, surface, and linkages.
///
/// Clones share all three.
#[derive(Clone)]
pub struct EventBus {
    handle: BusHandle,
    surface: Operations,
    links: Rc<RefCell<LinkTable>>,
}

impl EventBus {
    /// Attach with a fresh handle and the full surface.
    #[must_use]
    pub fn new() -> Self {
        Self::install(BusHandle::new(), Operations::all())
    }

    /// See [`attach`].
    pub fn attach<H: HandleSlots + ?Sized>(host: &H, options: AttachOptions) -> Result<Self, EventedError> {
        attach(host, options)
    }

    /// The self-teardown hook goes on a handle once; attaching the same
    /// handle again shares it.
    fn install(handle: BusHandle, surface: Operations) -> Self {
        if handle.mark_attached() {
            let weak = handle.downgrade();
            handle.add_teardown(move || {
                if let Some(handle) = weak.upgrade() {
                    let removed = channel::unregister(&handle, None, None);
                    debug!(handle = %handle.id(), removed, "disposed, own listeners removed");
                }
            });
            debug!(handle = %handle.id(), ?surface, "evented capability attached");
        } else {
            debug!(handle = %handle.id(), ?surface, "handle already attached, sharing teardown");
        }
        Self {
            handle,
            surface,
            links: Rc::new(RefCell::new(LinkTable::default())),
        }
    }

    #[must_use]
    pub fn handle(&self) -> &BusHandle {
        &self.handle
    }

    #[must_use]
    pub fn surface(&self) -> Operations {
        self.surface
    }

    #[must_use]
    pub fn is_capability_bearing(&self) -> bool {
        is_capability_bearing(self.surface)
    }

    /// Live cross-object linkages this object owns.
    ///
    /// Records whose target was dropped without being disposed are reclaimed
    /// first, together with their hooks on this object.
    #[must_use]
    pub fn linkage_count(&self) -> usize {
        linkage::prune(&self.links, &self.handle);
        self.links.borrow().len()
    }

    pub(crate) fn require(&self, op: Operations, name: &'static str) -> Result<(), EventedError> {
        if self.surface.contains(op) {
            Ok(())
        } else {
            Err(EventedError::OperationExcluded { op: name })
        }
    }

    fn downgrade(&self) -> WeakBus {
        WeakBus {
            handle: self.handle.downgrade(),
            links: Rc::downgrade(&self.links),
        }
    }

    // -- Operations --------------------------------------------------------

    pub(crate) fn add_listener(&self, args: ListenArgs) -> Result<(), EventedError> {
        let n = normalize_listen(&self.handle, args, "on")?;
        let target = n.target.handle();
        for ty in n.event_type.names() {
            channel::register(target, ty, n.bound.clone(), DispatchMode::Persistent);
        }
        if !n.is_self_target {
            linkage::link(
                &self.links,
                &self.handle,
                target,
                n.event_type.names(),
                n.listener.id(),
            );
        }
        Ok(())
    }

    pub(crate) fn add_once_listener(&self, args: ListenArgs) -> Result<(), EventedError> {
        let n = normalize_listen(&self.handle, args, "one")?;
        let target = n.target.handle();
        let bound = if n.is_self_target {
            n.bound
        } else {
            self.self_removing(&n.listener, &n.event_type).bind(&self.handle)
        };
        for ty in n.event_type.names() {
            channel::register(target, ty, bound.clone(), DispatchMode::Once);
        }
        Ok(())
    }

    pub(crate) fn add_any_listener(&self, args: ListenArgs) -> Result<(), EventedError> {
        let n = normalize_listen(&self.handle, args, "any")?;
        let bound = if n.is_self_target {
            n.bound
        } else {
            self.self_removing(&n.listener, &n.event_type).bind(&self.handle)
        };
        channel::register_any(n.target.handle(), n.event_type.names(), bound);
        Ok(())
    }

    /// Wrapper for cross-object `one`/`any`: on first call it removes itself
    /// from the target for every listed type, then runs `listener`.
    ///
    /// No linkage is installed for these; disposal order between the two
    /// objects is not guarded on this path.
    fn self_removing(&self, listener: &Listener, event_type: &EventType) -> Listener {
        let owner = self.downgrade();
        let types = event_type.names().to_vec();
        let original = listener.clone();
        listener.wrap(move |event| {
            owner.detach(event.target(), &types, original.id());
            original.call(event);
        })
    }

    pub(crate) fn remove_listeners(&self, args: OffArgs) -> Result<(), EventedError> {
        match normalize_off(&self.handle, args, "off")? {
            OffPlan::Own {
                event_type: None,
                listener,
            } => {
                channel::unregister(&self.handle, None, listener);
            }
            OffPlan::Own {
                event_type: Some(event_type),
                listener,
            } => {
                for ty in event_type.names() {
                    channel::unregister(&self.handle, Some(ty), listener);
                }
            }
            OffPlan::Other {
                target,
                event_type,
                listener,
            } => {
                detach(&self.links, &self.handle, target.handle(), event_type.names(), listener);
            }
        }
        Ok(())
    }

    pub(crate) fn emit(&self, event: EventInit, hash: Option<Map<String, Value>>) -> Result<bool, EventedError> {
        assert_type(Some(&EventType::from(event.event_type.as_str())), "trigger")?;
        trace!(handle = %self.handle.id(), event_type = %event.event_type, "trigger");
        Ok(channel::fire(&self.handle, event, hash).proceed())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handle", &self.handle)
            .field("surface", &self.surface)
            .field("linkages", &self.links.borrow().len())
            .finish()
    }
}

/// Remove `listener` from `target` for `types` and shrink the owner's
/// linkages to match.
fn detach(
    links: &RefCell<LinkTable>,
    owner: &BusHandle,
    target: &BusHandle,
    types: &[String],
    listener: ListenerId,
) {
    linkage::sever(links, owner, target, types, listener);
    for ty in types {
        channel::unregister(target, Some(ty), Some(listener));
    }
}

/// Non-owning view of an [`EventBus`], held by listeners that live on
/// another object's bus.
struct WeakBus {
    handle: WeakHandle,
    links: Weak<RefCell<LinkTable>>,
}

impl WeakBus {
    fn detach(&self, target: &BusHandle, types: &[String], listener: ListenerId) {
        match (self.links.upgrade(), self.handle.upgrade()) {
            (Some(links), Some(owner)) => detach(&links, &owner, target, types, listener),
            _ => {
                for ty in types {
                    channel::unregister(target, Some(ty), Some(listener));
                }
            }
        }
    }
}
