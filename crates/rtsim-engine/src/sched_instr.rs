//! # rtsim-engine::sched_instr
//!
//! `SchedInstr` is the exemplar instruction from §4.5: a fixed-duration
//! instruction whose `_endEvt` fires `onEnd`, which in turn advances the
//! owning task, lowers the kernel's preemption threshold, re-dispatches, and
//! only then lets any probes on `_threEvt` observe the result.
//!
//! `RTKernel` is an explicit capability trait rather than a downcast: a task
//! either has a kernel implementing it, or `Task::kernel()` returns
//! `KernelMismatch`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rtsim_types::prelude::*;

use crate::event::{bound, EventHandle, EventOps};
use crate::sim::{EngineCtx, Simulation};
use crate::task::{Instr, Task};

/// The scheduling capability a kernel must provide for `SchedInstr.onEnd` to
/// run: lower the preemption threshold, then decide what runs next.
pub trait RTKernel {
    fn disable_threshold(&mut self, ctx: &mut EngineCtx);
    fn dispatch(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError>;
}

/// Standard (non-immediate) priority `SchedInstr`'s two events are built
/// with; `process()` on `_threEvt` forces `IMMEDIATE_PRIORITY` regardless.
pub const DEFAULT_PRIORITY: i32 = 5;

pub struct SchedInstr {
    duration: Tick,
    father: Weak<RefCell<Task>>,
    end_evt: Option<EventHandle>,
    thre_evt: Option<EventHandle>,
}

impl SchedInstr {
    /// Builds a new instruction of fixed `duration`, owned by `father`.
    /// `_endEvt`/`_threEvt` are bound to a `Weak` reference to the returned
    /// `Rc`, so both can be constructed before the instruction is itself
    /// fully initialized — the usual "tie the knot" two-phase init this
    /// pattern needs whenever an event must close over its own owner.
    pub fn new(sim: &mut Simulation, duration: Tick, father: Weak<RefCell<Task>>) -> Rc<RefCell<SchedInstr>> {
        let this = Rc::new(RefCell::new(SchedInstr {
            duration,
            father,
            end_evt: None,
            thre_evt: None,
        }));

        let end_id = sim.alloc_event_id();
        let end_evt = bound(end_id, DEFAULT_PRIORITY, &this, |instr, ctx, _handle| {
            instr.on_end(ctx)
        });

        let thre_id = sim.alloc_event_id();
        let thre_evt = bound(thre_id, DEFAULT_PRIORITY, &this, |_instr, _ctx, _handle| Ok(()));

        {
            let mut inner = this.borrow_mut();
            inner.end_evt = Some(end_evt);
            inner.thre_evt = Some(thre_evt);
        }
        this
    }

    /// The "threshold lowered" signal event; attach probes to this (via
    /// `EventOps::add_trace`/`add_stat`) to observe threshold-lowering
    /// precisely when `onEnd` fires it, post-dispatch.
    pub fn thre_evt(&self) -> EventHandle {
        self.thre_evt
            .clone()
            .expect("thre_evt is set by SchedInstr::new before any other access")
    }

    pub fn end_evt(&self) -> EventHandle {
        self.end_evt
            .clone()
            .expect("end_evt is set by SchedInstr::new before any other access")
    }

    /// `onEnd`'s contract (§4.5, "the subtle bit"): advance the task first,
    /// then dispatch through the kernel, and only then let `_threEvt` fire —
    /// so anything observing `_threEvt` sees the post-dispatch task set, not
    /// the pre-dispatch one.
    fn on_end(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        // A dead father (like a dead `bound()` owner) makes this a no-op:
        // there is no task left to advance or dispatch.
        let Some(father) = self.father.upgrade() else {
            return Ok(());
        };
        father.borrow_mut().on_instr_end(ctx)?;

        let kernel = father.borrow().kernel()?;
        kernel.borrow_mut().disable_threshold(ctx);
        kernel.borrow_mut().dispatch(ctx)?;

        self.thre_evt().process(ctx, false)
    }
}

impl Instr for SchedInstr {
    fn schedule(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        let at = ctx.global_time + self.duration;
        self.end_evt().post(ctx, at, false)
    }

    fn deschedule(&mut self, ctx: &mut EngineCtx) {
        self.end_evt().drop_event(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::Trace;

    /// A kernel that just records the order its two methods were called in,
    /// for the S5 call-order assertion.
    struct RecordingKernel {
        log: Rc<RefCell<Vec<(&'static str, Tick)>>>,
    }

    impl RTKernel for RecordingKernel {
        fn disable_threshold(&mut self, ctx: &mut EngineCtx) {
            self.log.borrow_mut().push(("disableThreshold", ctx.global_time));
        }
        fn dispatch(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
            self.log.borrow_mut().push(("dispatch", ctx.global_time));
            Ok(())
        }
    }

    struct LoggingTrace {
        log: Rc<RefCell<Vec<(&'static str, Tick)>>>,
    }

    impl Trace for LoggingTrace {
        fn probe(&mut self, _event_id: EventId, last_time: Tick) {
            self.log.borrow_mut().push(("threEvt", last_time));
        }
    }

    #[test]
    fn s5_on_end_calls_father_then_kernel_then_thre_evt_same_tick() {
        let mut sim = Simulation::new(1);
        let log: Rc<RefCell<Vec<(&'static str, Tick)>>> = Rc::new(RefCell::new(Vec::new()));

        let task_entity = sim.entities().register(None, |_id| Task::new(vec![]));
        let task_rc = task_entity.rc();

        let instr = SchedInstr::new(&mut sim, Tick::new(5), Rc::downgrade(&task_rc));
        task_rc
            .borrow_mut()
            .set_instrs(vec![instr.clone() as Rc<RefCell<dyn Instr>>]);

        let kernel: Rc<RefCell<dyn RTKernel>> = Rc::new(RefCell::new(RecordingKernel { log: log.clone() }));
        task_rc.borrow_mut().set_kernel(&kernel);

        let trace = Rc::new(RefCell::new(LoggingTrace { log: log.clone() }));
        instr.borrow().thre_evt().add_trace(&(trace as Rc<RefCell<dyn Trace>>));

        sim.init_single_run().unwrap();
        sim.with_ctx(|ctx| instr.borrow_mut().schedule(ctx)).unwrap();
        sim.run_to(Tick::new(10)).unwrap();

        let calls: Vec<_> = log.borrow().iter().map(|(name, _)| *name).collect();
        assert_eq!(calls, vec!["disableThreshold", "dispatch", "threEvt"]);
        for (_, t) in log.borrow().iter() {
            assert_eq!(*t, Tick::new(5));
        }
    }
}
