#![forbid(unsafe_code)]

//! Listener identity and receiver binding.
//!
//! Every [`Listener`] is minted with a [`ListenerId`]. Clones share it, and
//! so does any wrapper produced by [`Listener::wrap`]. The channel removes
//! entries by id, which is what lets a caller remove a listener by the value
//! they registered even after it was wrapped or bound.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::Event;
use crate::handle::{BusHandle, WeakHandle};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity token shared by a listener and everything derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn mint() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Callback = dyn Fn(&Event);

/// An identity-tagged event callback.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    callback: Rc<Callback>,
}

impl Listener {
    /// Create a listener with a freshly minted identity.
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            id: ListenerId::mint(),
            callback: Rc::new(callback),
        }
    }

    /// Identity of this listener.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Build a different callable that carries this listener's identity.
    ///
    /// Removing either value removes entries registered with the other.
    pub fn wrap(&self, callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            id: self.id,
            callback: Rc::new(callback),
        }
    }

    /// Bind to a receiver; the result keeps this listener's identity.
    #[must_use]
    pub fn bind(&self, receiver: &BusHandle) -> BoundListener {
        BoundListener {
            listener: self.clone(),
            receiver: receiver.downgrade(),
        }
    }

    /// Invoke the callback directly.
    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    /// Whether two values are the very same callable, not just the same id.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl From<&Listener> for Listener {
    fn from(listener: &Listener) -> Self {
        listener.clone()
    }
}

/// A listener bound to the object it runs on behalf of.
///
/// The receiver is held weakly: a listener stored on another object's bus
/// must not keep its owner alive.
#[derive(Clone)]
pub struct BoundListener {
    listener: Listener,
    receiver: WeakHandle,
}

impl BoundListener {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.listener.id
    }

    /// Receiver handle, if the receiver is still alive.
    #[must_use]
    pub fn receiver(&self) -> Option<BusHandle> {
        self.receiver.upgrade()
    }

    pub(crate) fn call(&self, event: &Event) {
        self.listener.call(event);
    }
}

impl fmt::Debug for BoundListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundListener")
            .field("id", &self.listener.id)
            .field("receiver", &self.receiver.id())
            .finish()
    }
}
