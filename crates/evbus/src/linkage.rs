#![forbid(unsafe_code)]

//! Cross-object linkage.
//!
//! When object A listens on a different target B, A records a [`Linkage`]
//! next to the subscription. The record holds two teardown hooks:
//!
//! - `owner_hook`, on A's handle: if A is disposed first, remove the
//!   listener from B and drop B's hook.
//! - `target_hook`, on B's handle: if B is disposed first, remove the
//!   listener from B and drop A's hook.
//!
//! Both hooks look the record up by id and remove it, so whichever side runs
//! first consumes it and the other side finds nothing to do. An explicit
//! `off` shrinks the record's types and, once none are left, removes both
//! hooks directly. A target dropped without being disposed never runs its
//! hook; its records are pruned lazily on the owner's side.
//!
//! # Invariants
//!
//! 1. A live record always has both hooks installed.
//! 2. Hook closures hold the other side's handle weakly; A's hook owns A's
//!    table, B's hook only points at it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use evbus_core::{BusHandle, HookId, ListenerId, WeakHandle, channel};
use tracing::debug;

/// A cross-object subscription's cleanup record.
#[derive(Debug)]
pub struct Linkage {
    id: u64,
    pub owner_hook: HookId,
    pub target_hook: HookId,
    pub listener: ListenerId,
    /// Types still registered on the target under this record.
    pub types: Vec<String>,
    pub target: WeakHandle,
}

/// Linkages owned by one evented object.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: Vec<Linkage>,
    next_link: u64,
}

impl LinkTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Linkage> {
        self.links.iter()
    }

    fn next_id(&mut self) -> u64 {
        self.next_link += 1;
        self.next_link
    }

    fn take(&mut self, id: u64) -> Option<Linkage> {
        let index = self.links.iter().position(|l| l.id == id)?;
        Some(self.links.remove(index))
    }
}

fn unregister_types(target: &BusHandle, types: &[String], listener: ListenerId) {
    for ty in types {
        channel::unregister(target, Some(ty), Some(listener));
    }
}

fn take_strong(links: &RefCell<LinkTable>, id: u64) -> Option<Linkage> {
    let mut table = links.borrow_mut();
    table.take(id)
}

fn take_weak(links: &Weak<RefCell<LinkTable>>, id: u64) -> Option<Linkage> {
    let links = links.upgrade()?;
    take_strong(&links, id)
}

/// Drop records whose target handle is gone, removing their owner hooks.
///
/// A target discarded without `dispose` never runs its hook, so its records
/// are reclaimed here instead. Returns the number of records dropped.
pub(crate) fn prune(links: &RefCell<LinkTable>, owner: &BusHandle) -> usize {
    let dead: Vec<Linkage> = {
        let mut table = links.borrow_mut();
        let (dead, live): (Vec<Linkage>, Vec<Linkage>) = std::mem::take(&mut table.links)
            .into_iter()
            .partition(|l| l.target.upgrade().is_none());
        table.links = live;
        dead
    };
    for link in &dead {
        owner.remove_teardown(link.owner_hook);
    }
    if !dead.is_empty() {
        debug!(owner = %owner.id(), removed = dead.len(), "pruned linkages of dropped targets");
    }
    dead.len()
}

/// Record a linkage for `listener` registered on `target` for `types`, and
/// install its two teardown hooks.
pub(crate) fn link(
    links: &Rc<RefCell<LinkTable>>,
    owner: &BusHandle,
    target: &BusHandle,
    types: &[String],
    listener: ListenerId,
) {
    prune(links, owner);
    let id = links.borrow_mut().next_id();

    let owner_hook = {
        let links = Rc::clone(links);
        let target = target.downgrade();
        let owner_id = owner.id();
        owner.add_teardown(move || {
            let Some(link) = take_strong(&links, id) else {
                return;
            };
            debug!(owner = %owner_id, target = %link.target.id(), listener = %link.listener, "owner disposed, severing linkage");
            if let Some(target) = target.upgrade() {
                unregister_types(&target, &link.types, link.listener);
                target.remove_teardown(link.target_hook);
            }
        })
    };

    let target_hook = {
        let links = Rc::downgrade(links);
        let owner = owner.downgrade();
        let target_weak = target.downgrade();
        target.add_teardown(move || {
            let Some(link) = take_weak(&links, id) else {
                return;
            };
            debug!(owner = %owner.id(), target = %target_weak.id(), listener = %link.listener, "target disposed, severing linkage");
            if let Some(target) = target_weak.upgrade() {
                unregister_types(&target, &link.types, link.listener);
            }
            if let Some(owner) = owner.upgrade() {
                owner.remove_teardown(link.owner_hook);
            }
        })
    };

    debug!(owner = %owner.id(), target = %target.id(), %listener, ?types, "linked");
    links.borrow_mut().links.push(Linkage {
        id,
        owner_hook,
        target_hook,
        listener,
        types: types.to_vec(),
        target: target.downgrade(),
    });
}

/// Drop `types` from every linkage of `listener` on `target`. Records left
/// with no types are removed together with both hooks.
///
/// Returns the number of records removed.
pub(crate) fn sever(
    links: &RefCell<LinkTable>,
    owner: &BusHandle,
    target: &BusHandle,
    types: &[String],
    listener: ListenerId,
) -> usize {
    prune(links, owner);
    let emptied: Vec<Linkage> = {
        let mut table = links.borrow_mut();
        for link in table
            .links
            .iter_mut()
            .filter(|l| l.listener == listener && l.target.id() == target.id())
        {
            link.types.retain(|t| !types.contains(t));
        }
        let (emptied, kept): (Vec<Linkage>, Vec<Linkage>) = std::mem::take(&mut table.links)
            .into_iter()
            .partition(|l| l.types.is_empty());
        table.links = kept;
        emptied
    };
    for link in &emptied {
        owner.remove_teardown(link.owner_hook);
        target.remove_teardown(link.target_hook);
    }
    if !emptied.is_empty() {
        debug!(owner = %owner.id(), target = %target.id(), %listener, removed = emptied.len(), "severed");
    }
    emptied.len()
}
