//! # rtsim-engine::entity
//!
//! The entity registry: a collection of named long-lived simulation objects,
//! multicasting `newRun`/`endRun` to every live entity at replica
//! boundaries. It is an ordinary value owned by whatever constructs it
//! (typically a [`crate::sim::Simulation`]), not a global — two registries,
//! like two `Simulation`s, can coexist.
//!
//! Registration uses non-owning [`Weak`] references: the registry observes
//! births and deaths, it never owns an entity. "Deregistered at
//! destruction" is implemented with an RAII guard ([`Entity<T>`]) whose
//! `Drop` removes the registry entry — when the caller's handle to the
//! entity drops, so does its registration.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use indexmap::IndexMap;
use rtsim_types::prelude::*;

/// The `newRun`/`endRun` hook contract every registered entity implements.
/// Both are no-ops by default; concrete entities override what they need.
pub trait SimEntity {
    fn new_run(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn end_run(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

struct Inner {
    next_id: EntityId,
    by_id: IndexMap<EntityId, Weak<RefCell<dyn SimEntity>>>,
    by_name: FxHashMap<String, EntityId>,
}

/// The process-wide-in-spirit, but ordinarily-owned, entity registry.
#[derive(Clone)]
pub struct EntityRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 0,
                by_id: IndexMap::new(),
                by_name: FxHashMap::default(),
            })),
        }
    }

    /// Registers a new entity. `name`, if non-empty, must be unique among
    /// currently-registered entities — a precondition the caller (the
    /// scenario loader, in practice) is expected to validate before
    /// construction; this is an internal invariant, not a runtime fault, so
    /// a violation panics rather than returning a `SimError`. An empty name
    /// is allowed and gets no lookup binding (§3): any number of entities may
    /// share the empty name, none of them occupying a `by_name` slot.
    pub fn register<T: SimEntity + 'static>(
        &self,
        name: Option<String>,
        make: impl FnOnce(EntityId) -> T,
    ) -> Entity<T> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id = inner.next_id.checked_add(1).expect("EntityId overflow");
            if let Some(name) = &name {
                if !name.is_empty() {
                    assert!(
                        !inner.by_name.contains_key(name),
                        "entity name '{name}' is already registered"
                    );
                    inner.by_name.insert(name.clone(), id);
                }
            }
            id
        };
        let obj = Rc::new(RefCell::new(make(id)));
        let weak: Weak<RefCell<dyn SimEntity>> = Rc::downgrade(&obj);
        self.inner.borrow_mut().by_id.insert(id, weak);

        Entity {
            id,
            name,
            registry: self.inner.clone(),
            inner: obj,
        }
    }

    /// `find(name) -> Entity`: returns the live entity registered under
    /// `name`, or `SimError::NotFound`.
    pub fn find(&self, name: &str) -> Result<Rc<RefCell<dyn SimEntity>>, SimError> {
        let id = *self
            .inner
            .borrow()
            .by_name
            .get(name)
            .ok_or_else(|| SimError::NotFound(name.to_string()))?;
        self.inner
            .borrow()
            .by_id
            .get(&id)
            .and_then(Weak::upgrade)
            .ok_or_else(|| SimError::NotFound(name.to_string()))
    }

    /// Invokes `new_run()` on every live entity, in registration order.
    /// Stops and propagates the first error, matching "an exception from
    /// any hook aborts the run".
    pub fn call_new_run(&self) -> Result<(), SimError> {
        let live: Vec<_> = self
            .inner
            .borrow()
            .by_id
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        for entity in live {
            entity.borrow_mut().new_run()?;
        }
        Ok(())
    }

    /// Invokes `end_run()` on every live entity, in registration order.
    pub fn call_end_run(&self) -> Result<(), SimError> {
        let live: Vec<_> = self
            .inner
            .borrow()
            .by_id
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        for entity in live {
            entity.borrow_mut().end_run()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner
            .borrow()
            .by_id
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered entity handle: derefs to the underlying `T` via
/// `borrow`/`borrow_mut`, and deregisters itself from the registry on drop.
pub struct Entity<T: SimEntity + 'static> {
    id: EntityId,
    name: Option<String>,
    registry: Rc<RefCell<Inner>>,
    inner: Rc<RefCell<T>>,
}

impl<T: SimEntity + 'static> Entity<T> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// A clone of the owning `Rc`, for event handlers to bind to (see
    /// `crate::event::bound`) without extending the entity's lifetime.
    pub fn rc(&self) -> Rc<RefCell<T>> {
        self.inner.clone()
    }
}

impl<T: SimEntity + 'static> Drop for Entity<T> {
    fn drop(&mut self) {
        let mut inner = self.registry.borrow_mut();
        inner.by_id.shift_remove(&self.id);
        if let Some(name) = &self.name {
            inner.by_name.remove(name);
        }
    }
}
