//! # rtsim-engine
//!
//! The discrete-event simulation kernel: the time-ordered event queue, the
//! entity registry and its `newRun`/`endRun` contract, the `Simulation`
//! driver that pulls events and advances virtual time, the Park-Miller RNG
//! and its distribution catalog, and the task/instruction fabric that
//! demonstrates how a scheduler kernel plugs into the queue.
//!
//! Everything here is a value a caller constructs explicitly; there are no
//! process-wide globals. Two `Simulation`s may coexist in one process (one
//! per test, for instance) without interference.

#![forbid(unsafe_code)]

pub mod debug;
pub mod entity;
pub mod event;
pub mod probes;
pub mod queue;
pub mod randvar;
pub mod rng;
pub mod sched_instr;
pub mod sim;
pub mod task;

pub mod prelude;
