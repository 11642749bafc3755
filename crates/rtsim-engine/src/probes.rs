//! # rtsim-engine::probes
//!
//! Statistics probes and trace sinks: the observers an [`crate::event::Event`]
//! fires after its handler runs, in insertion order, reading `last_time`
//! rather than the (possibly already re-posted) `time`.

use rtsim_types::prelude::*;

/// A statistics probe attached via `addStat`/`addParticle`.
pub trait Stat {
    fn observe(&mut self, last_time: Tick, event_id: EventId);
}

/// A trace sink attached via `addTrace`.
pub trait Trace {
    fn probe(&mut self, event_id: EventId, last_time: Tick);
}

/// The minimal concrete probe used by the S3 scenario: counts firings and
/// remembers the `last_time` of the most recent one.
#[derive(Debug, Default)]
pub struct StatCount {
    count: u64,
    last_observed: Option<Tick>,
}

impl StatCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_observed(&self) -> Option<Tick> {
        self.last_observed
    }
}

impl Stat for StatCount {
    fn observe(&mut self, last_time: Tick, _event_id: EventId) {
        self.count += 1;
        self.last_observed = Some(last_time);
    }
}

/// A trace sink that simply records every `(EventId, Tick)` firing pair, in
/// order. Useful in tests that need to assert a call sequence without
/// wiring a real file-backed trace writer.
#[derive(Debug, Default)]
pub struct VecTrace {
    entries: Vec<(EventId, Tick)>,
}

impl VecTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(EventId, Tick)] {
        &self.entries
    }
}

impl Trace for VecTrace {
    fn probe(&mut self, event_id: EventId, last_time: Tick) {
        self.entries.push((event_id, last_time));
    }
}
