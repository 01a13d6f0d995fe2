#![forbid(unsafe_code)]

//! Core: bus handles, listener identity, and the channel primitive.
//!
//! # Role in evbus
//! `evbus-core` is the transport layer. It owns the per-object listener
//! tables, hands out stable listener identities, and delivers events
//! synchronously. It knows nothing about cross-object subscriptions or call
//! shapes; those live in `evbus`.
//!
//! # Primary responsibilities
//! - **BusHandle**: shared, pointer-identified endpoint owning a listener
//!   table and a list of teardown hooks.
//! - **Listener**: callable tagged with a [`ListenerId`] that survives
//!   wrapping and binding, so removal by reference keeps working.
//! - **Channel**: `register` / `unregister` / `fire` over a handle, with
//!   snapshot dispatch that tolerates mutation from inside a listener.
//! - **Event**: the delivered record (`type`, `target`, `receiver`, `data`).
//!
//! # How it fits in the system
//! `evbus` normalizes and validates calls, then drives this crate. Disposal
//! is modelled as the `"dispose"` event followed by the handle's teardown
//! hooks, see [`BusHandle::dispose`].

pub mod channel;
pub mod event;
pub mod handle;
pub mod listener;

pub use channel::{Dispatch, DispatchMode, EntryId};
pub use event::{DISPOSE, Event, EventInit, EventType};
pub use handle::{BusHandle, HandleId, HookId, WeakHandle};
pub use listener::{BoundListener, Listener, ListenerId};
