#![forbid(unsafe_code)]

//! Evented: an attachable on/one/off/trigger capability.
//!
//! # Role in evbus
//! `evbus` turns any host type into a publisher and subscriber of named
//! events. A host can listen on its own bus or on another object's bus, and
//! cross-object subscriptions are severed automatically when either side is
//! disposed.
//!
//! # Primary responsibilities
//! - **attach / EventBus**: create (or adopt) the host's bus handle, install
//!   its teardown hook, and record the exposed surface.
//! - **Evented**: the public `on`, `one`, `any`, `off`, `trigger` and
//!   `dispose` operations.
//! - **Normalization**: decide "self" vs "other target" once per call.
//! - **Linkage**: tie a cross-object subscription to both objects'
//!   lifetimes so neither side keeps dangling callbacks.
//!
//! # How it fits in the system
//! Delivery, ordering, and identity-based removal come from `evbus-core`.
//! This crate validates calls before touching anything, so a rejected call
//! leaves both objects exactly as they were.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use evbus::{EventBus, Evented, Listener};
//!
//! let player = EventBus::new();
//! let overlay = EventBus::new();
//!
//! let shown = Rc::new(Cell::new(0));
//! let shown_in_listener = Rc::clone(&shown);
//! let on_play = Listener::new(move |_| shown_in_listener.set(shown_in_listener.get() + 1));
//!
//! overlay.on((&player, "play", &on_play)).unwrap();
//! player.trigger("play").unwrap();
//! assert_eq!(shown.get(), 1);
//!
//! // Disposing either side severs the subscription.
//! player.dispose();
//! assert_eq!(overlay.linkage_count(), 0);
//! ```

pub mod bus;
pub mod error;
pub mod evented;
pub mod linkage;
pub mod normalize;
pub mod options;
pub mod target;
pub mod validate;

pub use bus::{EventBus, attach};
pub use error::{EventedError, OptionsError};
pub use evented::Evented;
pub use normalize::{ListenArgs, OffArgs};
pub use options::{AttachOptions, HandleSlots, Operations};
pub use target::Target;

pub use evbus_core::{
    BusHandle, DISPOSE, Dispatch, DispatchMode, Event, EventInit, EventType, Listener, ListenerId,
};
