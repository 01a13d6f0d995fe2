#![forbid(unsafe_code)]

//! Listen targets: a bare bus handle or another evented object.

use evbus_core::BusHandle;

use crate::evented::Evented;
use crate::options::Operations;

/// Where a cross-object call registers its listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A bus handle not fronted by an evented object.
    Native(BusHandle),
    /// Another evented object, with the surface it was attached with.
    Evented {
        handle: BusHandle,
        surface: Operations,
    },
}

impl Target {
    #[must_use]
    pub fn native(handle: BusHandle) -> Self {
        Self::Native(handle)
    }

    /// Target the bus of an evented object.
    #[must_use]
    pub fn of<E: Evented + ?Sized>(object: &E) -> Self {
        let bus = object.event_bus();
        Self::Evented {
            handle: bus.handle().clone(),
            surface: bus.surface(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> &BusHandle {
        match self {
            Self::Native(handle) | Self::Evented { handle, .. } => handle,
        }
    }
}

impl From<BusHandle> for Target {
    fn from(handle: BusHandle) -> Self {
        Self::Native(handle)
    }
}

impl<E: Evented + ?Sized> From<&E> for Target {
    fn from(object: &E) -> Self {
        Self::of(object)
    }
}
