//! Convenience re-exports for downstream crates (`rtsim-cli`, integration
//! tests): the handful of types and traits almost every call site needs.

pub use rtsim_types::prelude::*;

pub use crate::debug::DebugStream;
pub use crate::entity::{Entity, EntityRegistry, SimEntity};
pub use crate::event::{bound, Event, EventHandle, EventOps};
pub use crate::probes::{Stat, StatCount, Trace, VecTrace};
pub use crate::randvar::{create_instance as create_randvar, RandomVar, CATALOG as RANDVAR_CATALOG};
pub use crate::rng::RandomGen;
pub use crate::sched_instr::{RTKernel, SchedInstr};
pub use crate::sim::{EngineCtx, Simulation};
pub use crate::task::{Instr, Task};
