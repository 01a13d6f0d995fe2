#![forbid(unsafe_code)]

//! The `Evented` trait: the public on/one/any/off/trigger surface.
//!
//! A type opts in by embedding an [`EventBus`] and returning it from
//! [`Evented::event_bus`]. Every operation checks the surface the bus was
//! attached with before doing anything else, and returns `&Self` so calls
//! can be chained with `?`.
//!
//! # Call shapes
//!
//! | call                               | meaning                                  |
//! |------------------------------------|------------------------------------------|
//! | `x.on(("play", &l))`               | listen on `x`'s own bus                  |
//! | `x.on((&y, "play", &l))`           | listen on `y`, linked to both lifetimes  |
//! | `x.on((x.event_bus(), "play", &l))`| same as the first row                    |
//! | `x.off(())`                        | remove everything on `x`'s own bus       |
//! | `x.off("play")`                    | remove every `"play"` listener on `x`    |
//! | `x.off((&y, "play", &l))`          | undo a cross-object `on`                 |

use evbus_core::EventInit;
use serde_json::{Map, Value};

use crate::bus::EventBus;
use crate::error::EventedError;
use crate::normalize::{ListenArgs, OffArgs};
use crate::options::Operations;

/// An object carrying the evented capability.
pub trait Evented {
    fn event_bus(&self) -> &EventBus;

    /// Register a persistent listener.
    fn on(&self, args: impl Into<ListenArgs>) -> Result<&Self, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::ON, "on")?;
        bus.add_listener(args.into())?;
        Ok(self)
    }

    /// Register a listener that runs at most once per listed type.
    ///
    /// On another object, the first delivery of any listed type removes it
    /// from all of them. Unlike `on`, this does not link the two objects'
    /// lifetimes.
    fn one(&self, args: impl Into<ListenArgs>) -> Result<&Self, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::ONE, "one")?;
        bus.add_once_listener(args.into())?;
        Ok(self)
    }

    /// Register a listener that runs once for whichever listed type fires
    /// first.
    fn any(&self, args: impl Into<ListenArgs>) -> Result<&Self, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::ANY, "any")?;
        bus.add_any_listener(args.into())?;
        Ok(self)
    }

    /// Remove listeners; see the module docs for the accepted shapes.
    fn off(&self, args: impl Into<OffArgs>) -> Result<&Self, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::OFF, "off")?;
        bus.remove_listeners(args.into())?;
        Ok(self)
    }

    /// Fire an event on this object's own bus.
    ///
    /// Returns `Ok(false)` if a listener called `prevent_default`.
    /// Triggering `"dispose"` behaves like [`Evented::dispose`].
    fn trigger(&self, event: impl Into<EventInit>) -> Result<bool, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::TRIGGER, "trigger")?;
        bus.emit(event.into(), None)
    }

    /// Like [`Evented::trigger`], merging `hash` into the event data.
    fn trigger_with(&self, event: impl Into<EventInit>, hash: Map<String, Value>) -> Result<bool, EventedError>
    where
        Self: Sized,
    {
        let bus = self.event_bus();
        bus.require(Operations::TRIGGER, "trigger")?;
        bus.emit(event.into(), Some(hash))
    }

    /// Fire `"dispose"`, then tear down: own listeners are removed and every
    /// linkage this object takes part in is severed.
    fn dispose(&self) {
        self.event_bus().handle().dispose();
    }
}

impl Evented for EventBus {
    fn event_bus(&self) -> &EventBus {
        self
    }
}
