//! # rtsim-engine::task
//!
//! `Task` is an entity owning an ordered list of [`Instr`]s. `onInstrEnd()`
//! advances the instruction pointer and kicks off the next instruction's
//! `schedule()`, one-by-one, matching §4.5's state-machine contract. The
//! instruction list itself is `Rc<RefCell<dyn Instr>>`-shaped rather than
//! `Box<dyn Instr>` because an instruction needs to bind its own `_endEvt`
//! to a `Weak` reference to itself (see [`crate::sched_instr::SchedInstr`]),
//! which requires the instruction to already be behind an `Rc`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rtsim_types::prelude::*;

use crate::entity::SimEntity;
use crate::sim::EngineCtx;

/// One step of a task's instruction sequence. `schedule()` is called when
/// the task starts executing the instruction; `deschedule()` on preemption,
/// before the instruction has finished on its own.
pub trait Instr {
    fn schedule(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError>;
    fn deschedule(&mut self, ctx: &mut EngineCtx);
}

/// A task entity: an ordered sequence of instructions, driven one at a time.
/// `Task` itself implements no scheduling policy; a kernel (see
/// [`crate::sched_instr::RTKernel`]) decides when a task's current
/// instruction runs.
pub struct Task {
    instrs: Vec<Rc<RefCell<dyn Instr>>>,
    current: usize,
    kernel: Option<Weak<RefCell<dyn crate::sched_instr::RTKernel>>>,
}

impl Task {
    pub fn new(instrs: Vec<Rc<RefCell<dyn Instr>>>) -> Self {
        Self {
            instrs,
            current: 0,
            kernel: None,
        }
    }

    pub fn set_kernel(&mut self, kernel: &Rc<RefCell<dyn crate::sched_instr::RTKernel>>) {
        self.kernel = Some(Rc::downgrade(kernel));
    }

    /// Looks up the task's kernel. `KernelMismatch` if the task has none, or
    /// the kernel has since been dropped.
    pub fn kernel(&self) -> Result<Rc<RefCell<dyn crate::sched_instr::RTKernel>>, SimError> {
        self.kernel
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(SimError::KernelMismatch)
    }

    /// Replaces the instruction list wholesale. Used by scenario wiring to
    /// inject instructions built after the task itself is registered (an
    /// instruction's `_endEvt` is bound to a `Weak` reference to its own
    /// `Rc`, which in turn needs a `Weak<Task>` back-reference that only
    /// exists once the task is constructed).
    pub fn set_instrs(&mut self, instrs: Vec<Rc<RefCell<dyn Instr>>>) {
        self.instrs = instrs;
        self.current = 0;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_instr(&self) -> Option<Rc<RefCell<dyn Instr>>> {
        self.instrs.get(self.current).cloned()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Schedules the first instruction, starting the task running.
    pub fn start(&self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        if let Some(instr) = self.instrs.first() {
            instr.borrow_mut().schedule(ctx)?;
        }
        Ok(())
    }

    /// Called when the current instruction's `_endEvt` fires: advances the
    /// pointer and schedules the next instruction, if any are left. A task
    /// whose last instruction has just ended simply stops; there is no
    /// wraparound (that is `PeriodicTask`'s concern, out of scope per §1).
    pub fn on_instr_end(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        self.current += 1;
        if let Some(instr) = self.instrs.get(self.current) {
            instr.borrow_mut().schedule(ctx)?;
        }
        Ok(())
    }
}

impl SimEntity for Task {
    fn new_run(&mut self) -> Result<(), SimError> {
        self.current = 0;
        Ok(())
    }
}
