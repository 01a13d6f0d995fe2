#![forbid(unsafe_code)]

//! Integration tests for the evented surface.
//!
//! These tests validate that a host carrying an [`EventBus`] can:
//! - listen and fire on its own bus
//! - listen on another object and have the subscription follow both lifetimes
//! - remove listeners by identity without leaking cleanup hooks
//! - reject malformed calls without touching either side

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use evbus::{
    AttachOptions, BusHandle, EventBus, Evented, EventedError, Listener, OffArgs, Operations,
    Target, attach,
};
use evbus_core::channel;
use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use tracing::{Level, info};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::TRACE)
        .try_init();
}

/// A host type that opts into the capability by embedding a bus.
#[derive(Debug)]
struct Player {
    events: EventBus,
}

impl Player {
    fn new() -> Self {
        Self {
            events: EventBus::new(),
        }
    }
}

impl Evented for Player {
    fn event_bus(&self) -> &EventBus {
        &self.events
    }
}

fn counter() -> (Rc<Cell<u32>>, Listener) {
    let hits = Rc::new(Cell::new(0u32));
    let hits_clone = Rc::clone(&hits);
    let listener = Listener::new(move |_| hits_clone.set(hits_clone.get() + 1));
    (hits, listener)
}

/// Hooks present on a freshly attached object: its own teardown.
const BASELINE_HOOKS: usize = 1;

// ── Attachment ────────────────────────────────────────────────────────────

#[test]
fn attach_yields_one_handle_and_requested_surface() {
    init_tracing();
    let full = attach(&(), AttachOptions::new()).unwrap();
    assert_eq!(full.surface(), Operations::all());
    assert_eq!(full.handle().hook_count(), BASELINE_HOOKS);

    let restricted = attach(&(), AttachOptions::new().with_exclude_names("one|any").unwrap()).unwrap();
    assert_eq!(
        restricted.surface(),
        Operations::ON | Operations::OFF | Operations::TRIGGER
    );
    let (_, l) = counter();
    assert_eq!(
        restricted.one(("x", &l)).unwrap_err(),
        EventedError::OperationExcluded { op: "one" }
    );
    assert_eq!(restricted.handle().listener_count(), 0);
    assert!(restricted.on(("x", &l)).is_ok());
}

#[test]
fn event_bus_key_adopts_existing_handle() {
    let existing = BusHandle::new();
    let mut slots = HashMap::new();
    slots.insert("el".to_string(), existing.clone());

    let bus = attach(&slots, AttachOptions::new().with_event_bus_key("el")).unwrap();
    let (hits, l) = counter();
    bus.on(("ready", &l)).unwrap();
    channel::fire(&existing, "ready", None);
    assert_eq!(hits.get(), 1);

    assert_eq!(
        attach(&slots, AttachOptions::new().with_event_bus_key("missing")).unwrap_err(),
        EventedError::InvalidEventBusKey {
            key: "missing".into()
        }
    );
}

// ── Own bus ───────────────────────────────────────────────────────────────

#[test]
fn on_then_trigger_delivers_record_once() {
    init_tracing();
    let player = Player::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let l = Listener::new(move |e| {
        seen_clone.borrow_mut().push((
            e.event_type().to_string(),
            e.target().id(),
            e.receiver().map(|r| r.id()),
        ));
    });

    player.on(("play", &l)).unwrap();
    assert!(player.trigger("play").unwrap());

    let id = player.event_bus().handle().id();
    assert_eq!(*seen.borrow(), vec![("play".to_string(), id, Some(id))]);
    info!(listeners = player.event_bus().handle().listener_count(), "own bus delivery ok");
}

#[test]
fn one_fires_once() {
    let player = Player::new();
    let (hits, l) = counter();
    player.one(("play", &l)).unwrap();
    player.trigger("play").unwrap();
    player.trigger("play").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn any_fires_once_across_types() {
    let player = Player::new();
    let (hits, l) = counter();
    player.any((["play", "pause"], &l)).unwrap();
    player.trigger("pause").unwrap();
    player.trigger("play").unwrap();
    player.trigger("pause").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn multi_type_on_registers_each_type() {
    let player = Player::new();
    let (hits, l) = counter();
    player.on((vec!["a", "b"], &l)).unwrap();
    player.trigger("a").unwrap();
    player.trigger("b").unwrap();
    assert_eq!(hits.get(), 2);
    player.off((vec!["a", "b"], &l)).unwrap();
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn off_wildcards_on_own_bus() {
    let player = Player::new();
    let (hits_a, a) = counter();
    let (hits_b, b) = counter();
    player.on(("x", &a)).unwrap().on(("x", &b)).unwrap().on(("y", &a)).unwrap();

    player.off(("x", &a)).unwrap();
    player.trigger("x").unwrap();
    assert_eq!((hits_a.get(), hits_b.get()), (0, 1));

    player.off(OffArgs::listener(&a)).unwrap();
    player.trigger("y").unwrap();
    assert_eq!(hits_a.get(), 0);

    player.off("x").unwrap();
    player.trigger("x").unwrap();
    assert_eq!(hits_b.get(), 1);
}

#[test]
fn off_with_no_arguments_removes_everything() {
    let player = Player::new();
    let (hits, l) = counter();
    player.on(("a", &l)).unwrap();
    player.on(("b", &l)).unwrap();
    player.one(("c", &l)).unwrap();
    player.off(()).unwrap();
    for ty in ["a", "b", "c"] {
        player.trigger(ty).unwrap();
    }
    assert_eq!(hits.get(), 0);
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn explicit_self_target_is_not_cross_object() {
    let player = Player::new();
    let (hits, l) = counter();
    player.on((&player, "x", &l)).unwrap();
    player
        .on((player.event_bus().handle().clone(), "y", &l))
        .unwrap();
    assert_eq!(player.event_bus().linkage_count(), 0);
    assert_eq!(player.event_bus().handle().hook_count(), BASELINE_HOOKS);
    player.trigger("x").unwrap();
    player.trigger("y").unwrap();
    assert_eq!(hits.get(), 2);
}

#[test]
fn trigger_with_merges_hash_and_reports_prevent_default() {
    let player = Player::new();
    let seen = Rc::new(RefCell::new(None));
    let seen_clone = Rc::clone(&seen);
    let l = Listener::new(move |e| {
        *seen_clone.borrow_mut() = e.get("time").cloned();
        e.prevent_default();
    });
    player.on(("seek", &l)).unwrap();

    let mut hash = Map::new();
    hash.insert("time".into(), json!(12.5));
    assert!(!player.trigger_with("seek", hash).unwrap());
    assert_eq!(*seen.borrow(), Some(json!(12.5)));
    assert!(player.trigger("unheard").unwrap());
}

// ── Cross-object ──────────────────────────────────────────────────────────

#[test]
fn cross_object_on_fires_for_target_only() {
    init_tracing();
    let owner = Player::new();
    let source = Player::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let l = Listener::new(move |e| {
        seen_clone
            .borrow_mut()
            .push((e.target().id(), e.receiver().map(|r| r.id())));
    });

    owner.on((&source, "play", &l)).unwrap();
    source.trigger("play").unwrap();
    owner.trigger("play").unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![(
            source.event_bus().handle().id(),
            Some(owner.event_bus().handle().id())
        )]
    );
    assert_eq!(owner.event_bus().linkage_count(), 1);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS + 1);
    assert_eq!(source.event_bus().handle().hook_count(), BASELINE_HOOKS + 1);
}

#[test]
fn disposing_target_severs_and_leaves_owner_clean() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.on((&source, "play", &l)).unwrap();

    source.dispose();
    source.trigger("play").unwrap();

    assert_eq!(hits.get(), 0);
    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);
    owner.off(()).unwrap();
    assert_eq!(owner.event_bus().handle().listener_count(), 0);
}

#[test]
fn disposing_owner_removes_listener_from_target() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.on((&source, ["play", "pause"], &l)).unwrap();

    owner.dispose();
    source.trigger("play").unwrap();
    source.trigger("pause").unwrap();

    assert_eq!(hits.get(), 0);
    assert_eq!(source.event_bus().handle().listener_count(), 0);
    assert_eq!(source.event_bus().handle().hook_count(), BASELINE_HOOKS);
}

#[test]
fn triggering_dispose_is_disposal() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.on((&source, "play", &l)).unwrap();
    source.trigger("dispose").unwrap();
    source.trigger("play").unwrap();
    assert_eq!(hits.get(), 0);
    assert_eq!(owner.event_bus().linkage_count(), 0);
}

#[test]
fn dispose_listeners_observe_the_event_first() {
    let player = Player::new();
    let (hits, l) = counter();
    player.on(("dispose", &l)).unwrap();
    player.dispose();
    assert_eq!(hits.get(), 1);
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn off_target_after_on_leaves_nothing_behind() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.on((&source, "play", &l)).unwrap();
    owner.off((&source, "play", &l)).unwrap();
    source.trigger("play").unwrap();

    assert_eq!(hits.get(), 0);
    assert_eq!(source.event_bus().handle().listener_count(), 0);
    assert_eq!(owner.event_bus().handle().listener_count(), 0);
    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);
    assert_eq!(source.event_bus().handle().hook_count(), BASELINE_HOOKS);
}

#[test]
fn partial_off_keeps_remaining_types_linked() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.on((&source, ["a", "b"], &l)).unwrap();

    owner.off((&source, "a", &l)).unwrap();
    source.trigger("a").unwrap();
    source.trigger("b").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(owner.event_bus().linkage_count(), 1);

    owner.dispose();
    source.trigger("b").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(source.event_bus().handle().hook_count(), BASELINE_HOOKS);
}

#[test]
fn native_target_is_severed_on_its_dispose() {
    let owner = Player::new();
    let node = BusHandle::new();
    let (hits, l) = counter();
    owner.on((node.clone(), "click", &l)).unwrap();
    channel::fire(&node, "click", None);
    assert_eq!(hits.get(), 1);

    node.dispose();
    channel::fire(&node, "click", None);
    assert_eq!(hits.get(), 1);
    assert_eq!(node.listener_count(), 0);
    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);
}

#[test]
fn dropped_targets_do_not_accumulate_on_owner() {
    let owner = Player::new();
    let (_, l) = counter();
    for _ in 0..100 {
        let source = Player::new();
        owner.on((&source, "x", &l)).unwrap();
    }

    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);

    let source = Player::new();
    owner.on((&source, "x", &l)).unwrap();
    assert_eq!(owner.event_bus().linkage_count(), 1);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS + 1);
}

#[test]
fn cross_object_one_fires_once_without_linkage() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.one((&source, ["a", "b"], &l)).unwrap();

    // No dispose cascade is installed for `one`.
    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);
    assert_eq!(source.event_bus().handle().hook_count(), BASELINE_HOOKS);

    source.trigger("b").unwrap();
    source.trigger("a").unwrap();
    source.trigger("b").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(source.event_bus().handle().listener_count(), 0);
}

#[test]
fn cross_object_one_receiver_is_owner() {
    let owner = Player::new();
    let source = Player::new();
    let receiver = Rc::new(RefCell::new(None));
    let receiver_clone = Rc::clone(&receiver);
    let l = Listener::new(move |e| *receiver_clone.borrow_mut() = e.receiver().map(|r| r.id()));
    owner.one((&source, "x", &l)).unwrap();
    source.trigger("x").unwrap();
    assert_eq!(*receiver.borrow(), Some(owner.event_bus().handle().id()));
}

#[test]
fn cross_object_one_can_be_removed_before_firing() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.one((&source, "x", &l)).unwrap();
    owner.off((&source, "x", &l)).unwrap();
    source.trigger("x").unwrap();
    assert_eq!(hits.get(), 0);
    assert_eq!(source.event_bus().handle().listener_count(), 0);
}

#[test]
fn cross_object_any_fires_once() {
    let owner = Player::new();
    let source = Player::new();
    let (hits, l) = counter();
    owner.any((&source, ["a", "b"], &l)).unwrap();
    source.trigger("a").unwrap();
    source.trigger("b").unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(source.event_bus().handle().listener_count(), 0);
}

// ── Validation ────────────────────────────────────────────────────────────

#[test]
fn malformed_calls_register_nothing() {
    let owner = Player::new();
    let (_, l) = counter();
    let restricted = attach(&(), AttachOptions::new().with_exclude(Operations::OFF)).unwrap();

    assert!(matches!(
        owner.on(("", &l)),
        Err(EventedError::InvalidEventType { op: "on", .. })
    ));
    assert!(matches!(
        owner.one(("   ", &l)),
        Err(EventedError::InvalidEventType { op: "one", .. })
    ));
    assert!(matches!(
        owner.on((Vec::<String>::new(), &l)),
        Err(EventedError::InvalidEventType { op: "on", .. })
    ));
    assert_eq!(
        owner.on((&restricted, "x", &l)).unwrap_err(),
        EventedError::InvalidTarget { op: "on" }
    );
    assert!(matches!(
        owner.off(""),
        Err(EventedError::InvalidEventType { op: "off", .. })
    ));
    assert_eq!(
        owner
            .off(OffArgs::Other {
                target: Target::of(&restricted),
                event_type: Some("x".into()),
                listener: Some(l.clone()),
            })
            .unwrap_err(),
        EventedError::InvalidTarget { op: "off" }
    );
    assert_eq!(
        owner
            .off(OffArgs::Other {
                target: Target::of(&EventBus::new()),
                event_type: Some("x".into()),
                listener: None,
            })
            .unwrap_err(),
        EventedError::InvalidListener { op: "off" }
    );
    assert!(matches!(
        owner.trigger(" "),
        Err(EventedError::InvalidEventType { op: "trigger", .. })
    ));

    assert_eq!(owner.event_bus().handle().listener_count(), 0);
    assert_eq!(owner.event_bus().handle().hook_count(), BASELINE_HOOKS);
    assert_eq!(owner.event_bus().linkage_count(), 0);
    assert_eq!(restricted.handle().listener_count(), 0);
    assert_eq!(restricted.handle().hook_count(), BASELINE_HOOKS);
}

// ── Re-entrancy ───────────────────────────────────────────────────────────

#[test]
fn listener_may_dispose_its_emitter_mid_dispatch() {
    let player = Player::new();
    let (hits, tail) = counter();
    let weak = player.event_bus().handle().downgrade();
    let disposer = Listener::new(move |_| {
        if let Some(handle) = weak.upgrade() {
            handle.dispose();
        }
    });
    player.on(("x", &disposer)).unwrap();
    player.on(("x", &tail)).unwrap();

    player.trigger("x").unwrap();
    assert_eq!(hits.get(), 0);
    assert_eq!(player.event_bus().handle().listener_count(), 0);
}

#[test]
fn listener_may_remove_itself() {
    let player = Player::new();
    let hits = Rc::new(Cell::new(0u32));
    let bus = player.event_bus().clone();
    let slot: Rc<RefCell<Option<Listener>>> = Rc::new(RefCell::new(None));
    let slot_clone = Rc::clone(&slot);
    let hits_clone = Rc::clone(&hits);
    let l = Listener::new(move |_| {
        hits_clone.set(hits_clone.get() + 1);
        if let Some(me) = slot_clone.borrow().as_ref() {
            bus.off(("x", me)).unwrap();
        }
    });
    *slot.borrow_mut() = Some(l.clone());

    player.on(("x", &l)).unwrap();
    player.trigger("x").unwrap();
    player.trigger("x").unwrap();
    assert_eq!(hits.get(), 1);
    slot.borrow_mut().take();
}
