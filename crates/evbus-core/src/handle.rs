#![forbid(unsafe_code)]

//! Bus handles: the per-object endpoint events are registered and fired on.
//!
//! # Design
//!
//! [`BusHandle`] is a cheap clone of shared, reference-counted storage
//! (`Rc<..>`). Two handles are equal iff they point at the same storage.
//! Each handle owns:
//!
//! - a listener table, mutated only through [`crate::channel`];
//! - an ordered list of teardown hooks, run once by [`BusHandle::dispose`].
//!
//! # Invariants
//!
//! 1. A handle's [`HandleId`] never changes and is never reused.
//! 2. Teardown hooks run in insertion order, at most once each: the list is
//!    drained before the first hook runs.
//! 3. No `RefCell` borrow is held while a hook or listener runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::channel::{self, Dispatch, ListenerTable};
use crate::event::DISPOSE;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a bus handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus-{}", self.0)
    }
}

/// Identity of a teardown hook, used to remove it before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

struct Hook {
    id: HookId,
    run: Box<dyn FnOnce()>,
}

pub(crate) struct HandleInner {
    id: HandleId,
    pub(crate) table: RefCell<ListenerTable>,
    hooks: RefCell<Vec<Hook>>,
    attached: Cell<bool>,
}

/// Shared endpoint for one object's events.
#[derive(Clone)]
pub struct BusHandle {
    inner: Rc<HandleInner>,
}

impl BusHandle {
    /// Create a fresh handle with no listeners and no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HandleInner {
                id: HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)),
                table: RefCell::new(ListenerTable::default()),
                hooks: RefCell::new(Vec::new()),
                attached: Cell::new(false),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakHandle {
        WeakHandle {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn table(&self) -> &RefCell<ListenerTable> {
        &self.inner.table
    }

    // -- Teardown hooks ----------------------------------------------------

    /// Register a hook to run when this handle is disposed.
    pub fn add_teardown(&self, hook: impl FnOnce() + 'static) -> HookId {
        let id = HookId(NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed));
        self.inner.hooks.borrow_mut().push(Hook {
            id,
            run: Box::new(hook),
        });
        id
    }

    /// Remove a hook before it runs. Returns `false` if it was not present.
    pub fn remove_teardown(&self, id: HookId) -> bool {
        let mut hooks = self.inner.hooks.borrow_mut();
        let before = hooks.len();
        hooks.retain(|h| h.id != id);
        hooks.len() != before
    }

    /// Number of pending teardown hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    /// Mark this handle as fronted by an evented object.
    ///
    /// Returns `false` if it already was. The mark is cleared on teardown.
    pub fn mark_attached(&self) -> bool {
        !self.inner.attached.replace(true)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }

    /// Drain and run every pending hook.
    pub(crate) fn run_teardown(&self) {
        self.inner.attached.set(false);
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        if hooks.is_empty() {
            return;
        }
        debug!(handle = %self.id(), hooks = hooks.len(), "running teardown hooks");
        for hook in hooks {
            (hook.run)();
        }
    }

    /// Fire [`DISPOSE`] on this handle, then run its teardown hooks.
    pub fn dispose(&self) -> Dispatch {
        channel::fire(self, DISPOSE, None)
    }

    // -- Introspection -----------------------------------------------------

    /// Total number of registered entries across all types.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.table.borrow().len()
    }

    /// Number of entries registered for one type.
    #[must_use]
    pub fn listener_count_for(&self, event_type: &str) -> usize {
        self.inner.table.borrow().len_for(event_type)
    }

    #[must_use]
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count_for(event_type) > 0
    }

    /// Types with at least one entry, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.inner.table.borrow().types()
    }
}

impl Default for BusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BusHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BusHandle {}

impl Hash for BusHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("id", &self.inner.id)
            .field("listeners", &self.listener_count())
            .field("hooks", &self.hook_count())
            .finish()
    }
}

/// Non-owning reference to a [`BusHandle`].
#[derive(Clone)]
pub struct WeakHandle {
    id: HandleId,
    inner: Weak<HandleInner>,
}

impl WeakHandle {
    #[must_use]
    pub fn upgrade(&self) -> Option<BusHandle> {
        self.inner.upgrade().map(|inner| BusHandle { inner })
    }

    /// Id of the referenced handle, available even after it is dropped.
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl fmt::Debug for WeakHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("id", &self.id)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
