#![forbid(unsafe_code)]

//! Call-shape normalization.
//!
//! A listen call either targets the receiver itself or another object.
//! The shape is fixed at the call boundary by [`ListenArgs`] / [`OffArgs`];
//! normalization then applies one extra rule: an explicit target whose
//! handle *is* the receiver's handle counts as targeting self, and the
//! redundant target is dropped.
//!
//! `on`, `one` and `any` share [`normalize_listen`]; nothing here depends on
//! which of them is calling.

use evbus_core::{BoundListener, BusHandle, EventType, Listener, ListenerId};

use crate::error::EventedError;
use crate::target::Target;
use crate::validate::{assert_listener, assert_target, assert_type};

// ---------------------------------------------------------------------------
// Call shapes
// ---------------------------------------------------------------------------

/// Arguments of `on` / `one` / `any`.
#[derive(Debug, Clone)]
pub enum ListenArgs {
    /// `(type, listener)`
    Own {
        event_type: EventType,
        listener: Listener,
    },
    /// `(target, type, listener)`
    Other {
        target: Target,
        event_type: EventType,
        listener: Listener,
    },
}

impl<T: Into<EventType>, L: Into<Listener>> From<(T, L)> for ListenArgs {
    fn from((event_type, listener): (T, L)) -> Self {
        Self::Own {
            event_type: event_type.into(),
            listener: listener.into(),
        }
    }
}

impl<G: Into<Target>, T: Into<EventType>, L: Into<Listener>> From<(G, T, L)> for ListenArgs {
    fn from((target, event_type, listener): (G, T, L)) -> Self {
        Self::Other {
            target: target.into(),
            event_type: event_type.into(),
            listener: listener.into(),
        }
    }
}

/// Arguments of `off`. Missing parts are wildcards on the receiver's own
/// bus and errors once a target is given.
#[derive(Debug, Clone)]
pub enum OffArgs {
    Own {
        event_type: Option<EventType>,
        listener: Option<Listener>,
    },
    Other {
        target: Target,
        event_type: Option<EventType>,
        listener: Option<Listener>,
    },
}

impl OffArgs {
    /// Remove everything on the receiver's own bus.
    #[must_use]
    pub fn all() -> Self {
        Self::Own {
            event_type: None,
            listener: None,
        }
    }

    /// Remove one identity from every type on the receiver's own bus.
    #[must_use]
    pub fn listener(listener: impl Into<Listener>) -> Self {
        Self::Own {
            event_type: None,
            listener: Some(listener.into()),
        }
    }
}

impl From<()> for OffArgs {
    fn from((): ()) -> Self {
        Self::all()
    }
}

impl From<&str> for OffArgs {
    fn from(event_type: &str) -> Self {
        Self::from(EventType::from(event_type))
    }
}

impl From<String> for OffArgs {
    fn from(event_type: String) -> Self {
        Self::from(EventType::from(event_type))
    }
}

impl From<EventType> for OffArgs {
    fn from(event_type: EventType) -> Self {
        Self::Own {
            event_type: Some(event_type),
            listener: None,
        }
    }
}

impl<T: Into<EventType>, L: Into<Listener>> From<(T, L)> for OffArgs {
    fn from((event_type, listener): (T, L)) -> Self {
        Self::Own {
            event_type: Some(event_type.into()),
            listener: Some(listener.into()),
        }
    }
}

impl<G: Into<Target>, T: Into<EventType>, L: Into<Listener>> From<(G, T, L)> for OffArgs {
    fn from((target, event_type, listener): (G, T, L)) -> Self {
        Self::Other {
            target: target.into(),
            event_type: Some(event_type.into()),
            listener: Some(listener.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical form of a listen call.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub is_self_target: bool,
    pub target: Target,
    pub event_type: EventType,
    /// The listener as given.
    pub listener: Listener,
    /// The listener bound to the receiver; same identity.
    pub bound: BoundListener,
}

/// Resolve, validate, and bind a listen call.
pub fn normalize_listen(
    receiver: &BusHandle,
    args: ListenArgs,
    op: &'static str,
) -> Result<Normalized, EventedError> {
    let (target, event_type, listener) = match args {
        ListenArgs::Own {
            event_type,
            listener,
        } => (None, event_type, listener),
        ListenArgs::Other {
            target,
            event_type,
            listener,
        } => (Some(target), event_type, listener),
    };

    let target = target.filter(|t| !t.handle().ptr_eq(receiver));
    let is_self_target = target.is_none();
    let target = target.unwrap_or_else(|| Target::native(receiver.clone()));

    assert_target(&target, op)?;
    assert_type(Some(&event_type), op)?;

    let bound = listener.bind(receiver);
    Ok(Normalized {
        is_self_target,
        target,
        event_type,
        listener,
        bound,
    })
}

/// Canonical form of an `off` call.
#[derive(Debug, Clone)]
pub enum OffPlan {
    /// Remove from the receiver's own bus; `None` matches everything.
    Own {
        event_type: Option<EventType>,
        listener: Option<ListenerId>,
    },
    /// Remove a cross-object subscription and its linkage.
    Other {
        target: Target,
        event_type: EventType,
        listener: ListenerId,
    },
}

/// Resolve and validate an `off` call.
pub fn normalize_off(
    receiver: &BusHandle,
    args: OffArgs,
    op: &'static str,
) -> Result<OffPlan, EventedError> {
    match args {
        OffArgs::Own {
            event_type,
            listener,
        } => {
            if let Some(ty) = &event_type {
                assert_type(Some(ty), op)?;
            }
            Ok(OffPlan::Own {
                event_type,
                listener: listener.map(|l| l.id()),
            })
        }
        OffArgs::Other {
            target,
            event_type,
            listener,
        } => {
            assert_target(&target, op)?;
            assert_type(event_type.as_ref(), op)?;
            assert_listener(listener.as_ref(), op)?;
            let (Some(event_type), Some(listener)) = (event_type, listener) else {
                return Err(EventedError::InvalidListener { op });
            };
            if target.handle().ptr_eq(receiver) {
                return Ok(OffPlan::Own {
                    event_type: Some(event_type),
                    listener: Some(listener.id()),
                });
            }
            Ok(OffPlan::Other {
                target,
                event_type,
                listener: listener.id(),
            })
        }
    }
}
