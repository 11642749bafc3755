//! # rtsim-cli::wiring
//!
//! Builds a [`Simulation`] from a [`Scenario`]: one self-reposting
//! `RandomVar`-driven event per `[[generators]]` entry (the S6 pattern),
//! and one `Task` per `[[tasks]]` entry wired to a chain of `SchedInstr`
//! instructions driven by a single shared demo kernel. Concrete scheduler
//! policies are out of scope (§1); `DemoKernel` exists only to give
//! `SchedInstr.onEnd` somewhere real to call.

use std::cell::RefCell;
use std::rc::Rc;

use rtsim_engine::prelude::*;
use rtsim_engine::sched_instr::DEFAULT_PRIORITY;

use crate::scenario::Scenario;

/// A generator entity: redraws from its `RandomVar` and reposts itself every
/// time it fires, producing the S6 inter-arrival pattern.
struct Generator {
    name: String,
    var: Box<dyn RandomVar>,
    fire_count: u64,
}

impl SimEntity for Generator {
    fn new_run(&mut self) -> Result<(), SimError> {
        self.fire_count = 0;
        Ok(())
    }
}

/// The minimal `RTKernel` the CLI wires every task to: it has no real
/// scheduling policy, it just logs the two calls `SchedInstr.onEnd` makes so
/// a `--debug sched` run shows the call order from §8's S5 scenario.
struct DemoKernel {
    name: String,
}

impl RTKernel for DemoKernel {
    fn disable_threshold(&mut self, ctx: &mut EngineCtx) {
        tracing::debug!(kernel = %self.name, "t = [{}] --> DemoKernel::disable_threshold", ctx.global_time);
    }

    fn dispatch(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        tracing::debug!(kernel = %self.name, "t = [{}] --> DemoKernel::dispatch", ctx.global_time);
        Ok(())
    }
}

/// Holds the `Simulation` plus every entity/kernel that must stay alive for
/// the run: entities deregister on `Drop`, and a `SchedInstr`'s `_endEvt` is
/// bound only by a `Weak` reference to its own `Rc`, so the `Rc` itself has
/// to live somewhere for the whole run — here, inside `Task::instrs`, kept
/// alive in turn by these `Entity<Task>` handles.
pub struct Wiring {
    pub sim: Simulation,
    generators: Vec<(Entity<Generator>, EventHandle)>,
    tasks: Vec<Entity<Task>>,
    _kernel: Option<Rc<RefCell<dyn RTKernel>>>,
}

pub fn build(scenario: &Scenario, seed: i64) -> Result<Wiring, SimError> {
    let mut sim = Simulation::new(seed);

    let mut generators = Vec::new();
    for spec in &scenario.generators {
        let var = create_randvar(&spec.distribution, &spec.params, sim.default_generator())?;
        let entity = sim.entities().register(Some(spec.name.clone()), |_id| Generator {
            name: spec.name.clone(),
            var,
            fire_count: 0,
        });
        let gen_rc = entity.rc();
        let id = sim.alloc_event_id();
        let event = bound(id, DEFAULT_PRIORITY, &gen_rc, |gen, ctx, handle| {
            gen.fire_count += 1;
            tracing::debug!(generator = %gen.name, count = gen.fire_count, "t = [{}] --> Generator::fire", ctx.global_time);
            let delay = Tick::from(gen.var.get());
            handle.post(ctx, ctx.global_time + delay, false)
        });
        generators.push((entity, event));
    }

    let kernel: Option<Rc<RefCell<dyn RTKernel>>> = if scenario.tasks.is_empty() {
        None
    } else {
        Some(Rc::new(RefCell::new(DemoKernel {
            name: "demo-kernel".to_string(),
        })))
    };

    let mut tasks = Vec::new();
    for spec in &scenario.tasks {
        let entity = sim
            .entities()
            .register(Some(spec.name.clone()), |_id| Task::new(vec![]));
        let task_rc = entity.rc();

        let instrs: Vec<Rc<RefCell<dyn Instr>>> = spec
            .instructions
            .iter()
            .map(|i| SchedInstr::new(&mut sim, i.duration, Rc::downgrade(&task_rc)) as Rc<RefCell<dyn Instr>>)
            .collect();
        task_rc.borrow_mut().set_instrs(instrs);
        if let Some(kernel) = &kernel {
            task_rc.borrow_mut().set_kernel(kernel);
        }
        tasks.push(entity);
    }

    Ok(Wiring {
        sim,
        generators,
        tasks,
        _kernel: kernel,
    })
}

impl Wiring {
    /// Seeds every generator and starts every task. Called once before the
    /// first replica and again before each subsequent one, since
    /// `endSingleRun` clears the event queue (§4.3): nothing would ever fire
    /// in replica 2+ otherwise.
    fn seed_replica(&mut self) -> Result<(), SimError> {
        for (entity, event) in &self.generators {
            let at = self.sim.time();
            self.sim.post(event, at, false)?;
            let _ = entity;
        }
        for task in &self.tasks {
            self.sim.with_ctx(|ctx| task.borrow().start(ctx))?;
        }
        Ok(())
    }

    /// Runs `n_runs` replicas of length `length`, reseeding generators and
    /// tasks at the start of each one. Mirrors `Simulation::run`'s `nRuns`
    /// convention (§4.3) rather than calling it directly, since `run` has no
    /// hook for per-replica reseeding of self-sustaining events.
    pub fn run(&mut self, length: Tick, n_runs: i64) -> Result<(), SimError> {
        let n_runs = if n_runs == 2 {
            tracing::warn!("nRuns == 2 is not supported by the statistics engine; running 3 replicas instead");
            3
        } else {
            n_runs
        };

        let (replicas, init_batch, end_batch, hint) = match n_runs {
            n if n >= 3 => (n, true, true, n),
            1 => (1, true, true, 1),
            0 => (1, false, true, 1),
            -1 => (1, false, false, 1),
            n => (1, true, false, n.unsigned_abs() as i64),
        };

        if init_batch {
            self.sim.init_runs(hint);
        }

        for _ in 0..replicas {
            if let Err(err) = self.run_replica(length) {
                self.sim.clear_event_queue();
                return Err(err);
            }
        }

        if end_batch {
            self.sim.end_sim();
        }
        Ok(())
    }

    fn run_replica(&mut self, length: Tick) -> Result<(), SimError> {
        self.sim.init_single_run()?;
        self.seed_replica()?;
        let step_result = self.sim.run_to(length);
        let end_result = self.sim.end_single_run();
        step_result?;
        end_result
    }
}
