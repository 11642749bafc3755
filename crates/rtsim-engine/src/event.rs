//! # rtsim-engine::event
//!
//! `Event` is a handle onto a future callback. Rather than a deep `Event`
//! inheritance tree (one subclass per instruction kind), an event here is
//! one concrete struct holding a boxed closure; [`bound`] is the generic
//! adaptor that lets a callback close over a non-owning reference to its
//! owning entity without a dedicated subclass per owner type.
//!
//! An event is shared via `Rc<RefCell<Event>>` (aliased as [`EventHandle`]).
//! The queue holds the only strong reference to a *disposable* event; once
//! `action()` returns and the queue's local handle is dropped, nothing else
//! is holding a clone, so the event deallocates — ownership, not a manual
//! destructor call, is what "disposable" means here. A non-disposable event
//! is kept alive by its owning entity (e.g. a `Task` holding its own
//! instruction's `_endEvt`), which retains its own clone of the `Rc`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rtsim_types::prelude::*;

use crate::probes::{Stat, Trace};
use crate::sim::EngineCtx;

/// Priority forced by `process()` so the event fires ahead of any other
/// event at the same instant. Smaller priority values fire first.
pub const IMMEDIATE_PRIORITY: i32 = 0;

/// Scheduling metadata for an event. Meaningful ordering is `(time,
/// priority, order)`; `order` is assigned fresh on every `post` so two
/// re-posts of the same event at the same `(time, priority)` never collide.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventCore {
    pub id: EventId,
    pub time: Tick,
    pub last_time: Tick,
    pub priority: i32,
    pub std_priority: i32,
    pub order: u64,
    pub in_queue: bool,
    pub disposable: bool,
}

impl EventCore {
    /// The sort key the queue orders on.
    pub fn key(&self) -> (Tick, i32, u64) {
        (self.time, self.priority, self.order)
    }
}

type Handler = Box<dyn FnMut(&mut EngineCtx, &EventHandle) -> Result<(), SimError>>;

/// A scheduled future callback. See the module docs for the ownership model.
pub struct Event {
    pub(crate) core: EventCore,
    handler: Handler,
    stats: Vec<Weak<RefCell<dyn Stat>>>,
    particles: Vec<Weak<RefCell<dyn Stat>>>,
    traces: Vec<Weak<RefCell<dyn Trace>>>,
}

/// Shared handle to an [`Event`]. This is the type client code and the
/// engine both hold; methods live on [`EventOps`], implemented for it.
pub type EventHandle = Rc<RefCell<Event>>;

impl Event {
    /// Builds a new event with a fresh, stable `id` (obtain one from
    /// [`crate::queue::EventQueue::alloc_event_id`] or
    /// [`crate::sim::Simulation::new_event`]) and the given construction-time
    /// ("standard") priority.
    pub fn new(
        id: EventId,
        priority: i32,
        handler: impl FnMut(&mut EngineCtx, &EventHandle) -> Result<(), SimError> + 'static,
    ) -> EventHandle {
        Rc::new(RefCell::new(Event {
            core: EventCore {
                id,
                time: TICK_ZERO,
                last_time: TICK_ZERO,
                priority,
                std_priority: priority,
                order: 0,
                in_queue: false,
                disposable: false,
            },
            handler: Box::new(handler),
            stats: Vec::new(),
            particles: Vec::new(),
            traces: Vec::new(),
        }))
    }

    pub fn id(&self) -> EventId {
        self.core.id
    }

    pub fn time(&self) -> Tick {
        self.core.time
    }

    pub fn last_time(&self) -> Tick {
        self.core.last_time
    }

    pub fn is_in_queue(&self) -> bool {
        self.core.in_queue
    }

    pub fn priority(&self) -> i32 {
        self.core.priority
    }
}

/// The generic adaptor that binds a callback to a non-owning [`Weak`]
/// reference to the owning entity, so the event never keeps its owner
/// alive and a dead owner simply makes the event a no-op when it fires.
pub fn bound<T: 'static>(
    id: EventId,
    priority: i32,
    owner: &Rc<RefCell<T>>,
    mut callback: impl FnMut(&mut T, &mut EngineCtx, &EventHandle) -> Result<(), SimError> + 'static,
) -> EventHandle {
    let owner = Rc::downgrade(owner);
    Event::new(id, priority, move |ctx, handle| {
        match owner.upgrade() {
            Some(owner) => callback(&mut owner.borrow_mut(), ctx, handle),
            None => Ok(()),
        }
    })
}

/// The public operations on an event handle: `post`/`drop`/`process` per
/// §4.1, plus probe attachment. `action` is `pub(crate)`: it is the
/// engine-only entry point invoked by `Simulation::sim_step`, never by
/// client code directly.
pub trait EventOps {
    fn post(&self, ctx: &mut EngineCtx, at: Tick, disposable: bool) -> Result<(), SimError>;
    fn drop_event(&self, ctx: &mut EngineCtx);
    fn process(&self, ctx: &mut EngineCtx, disposable: bool) -> Result<(), SimError>;
    fn restore_priority(&self);
    fn add_stat(&self, probe: &Rc<RefCell<dyn Stat>>);
    fn add_particle(&self, probe: &Rc<RefCell<dyn Stat>>);
    fn add_trace(&self, probe: &Rc<RefCell<dyn Trace>>);
}

/// The engine-only entry point, `pub(crate)` so it is reachable from
/// `Simulation::sim_step` but not from client code, matching "never
/// invoked by user code directly".
pub(crate) trait EventAction {
    fn action(&self, ctx: &mut EngineCtx) -> Result<(), SimError>;
}

impl EventOps for EventHandle {
    fn post(&self, ctx: &mut EngineCtx, at: Tick, disposable: bool) -> Result<(), SimError> {
        let in_queue = self.borrow().core.in_queue;
        if in_queue {
            return Err(SimError::QueueDuplicate {
                event_id: self.borrow().core.id,
            });
        }
        if at < ctx.global_time {
            return Err(SimError::PostInPast {
                at,
                now: ctx.global_time,
            });
        }
        let order = ctx.queue.next_order();
        {
            let mut ev = self.borrow_mut();
            ev.core.time = at;
            ev.core.order = order;
            ev.core.in_queue = true;
            ev.core.disposable = disposable;
        }
        ctx.queue.push(self.clone());
        Ok(())
    }

    fn drop_event(&self, ctx: &mut EngineCtx) {
        let id = self.borrow().core.id;
        if self.borrow().core.in_queue {
            ctx.queue.remove(id);
            self.borrow_mut().core.in_queue = false;
        }
    }

    fn process(&self, ctx: &mut EngineCtx, disposable: bool) -> Result<(), SimError> {
        self.borrow_mut().core.priority = IMMEDIATE_PRIORITY;
        self.post(ctx, ctx.global_time, disposable)
    }

    fn restore_priority(&self) {
        let std_priority = self.borrow().core.std_priority;
        self.borrow_mut().core.priority = std_priority;
    }

    fn add_stat(&self, probe: &Rc<RefCell<dyn Stat>>) {
        self.borrow_mut().stats.push(Rc::downgrade(probe));
    }

    fn add_particle(&self, probe: &Rc<RefCell<dyn Stat>>) {
        self.borrow_mut().particles.push(Rc::downgrade(probe));
    }

    fn add_trace(&self, probe: &Rc<RefCell<dyn Trace>>) {
        self.borrow_mut().traces.push(Rc::downgrade(probe));
    }
}

impl EventAction for EventHandle {
    fn action(&self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        // Priority is restored to `std_priority` here, before `doit()` runs,
        // not after: `process()` forces `priority` to `IMMEDIATE` only to win
        // the current tick's ordering, and a handler may repost itself
        // (plain `post()`) from inside `doit()`. If priority were restored
        // only after the handler and probes have run, a repost performed
        // during `doit()` would push the event back into the queue keyed on
        // the still-forced `IMMEDIATE` priority, and the later restore would
        // then mutate `core.priority` in place with no corresponding heap
        // resift — desyncing the entry's heap position from its live sort
        // key. Restoring first means any repost inside the handler starts
        // from `std_priority`, and only a fresh `process()` call forces
        // `IMMEDIATE` again.
        let (last_time, event_id, disposable) = {
            let mut ev = self.borrow_mut();
            ev.core.last_time = ev.core.time;
            ev.core.in_queue = false;
            ev.core.priority = ev.core.std_priority;
            (ev.core.last_time, ev.core.id, ev.core.disposable)
        };

        // `disposable: false` promises some other owner already holds a
        // clone of this handle; the engine never frees anything explicitly,
        // survival is pure `Rc` refcounting. Catch a caller who forgot to
        // retain a clone immediately, rather than watching the event vanish
        // exactly as if it had been posted disposable.
        assert!(
            disposable || Rc::strong_count(self) > 1,
            "event {event_id} was posted non-disposable but no other owner retained a clone of it"
        );

        // The handler may re-borrow `self` (e.g. to repost itself), so the
        // closure must be taken out of the RefCell before it runs rather
        // than called while `self` is still borrowed.
        let mut handler = std::mem::replace(
            &mut self.borrow_mut().handler,
            Box::new(|_: &mut EngineCtx, _: &EventHandle| Ok(())),
        );
        let result = handler(ctx, self);
        self.borrow_mut().handler = handler;
        result?;

        let (stats, particles, traces) = {
            let ev = self.borrow();
            (ev.stats.clone(), ev.particles.clone(), ev.traces.clone())
        };
        for probe in stats.iter().chain(particles.iter()) {
            if let Some(probe) = probe.upgrade() {
                probe.borrow_mut().observe(last_time, event_id);
            }
        }
        for probe in &traces {
            if let Some(probe) = probe.upgrade() {
                probe.borrow_mut().probe(event_id, last_time);
            }
        }

        Ok(())
    }
}
