//! # rtsim-engine::debug
//!
//! `DebugStream` is the kernel's named-level debug/trace facility, bridged
//! onto `tracing` rather than a bespoke `ostream`-alike: `enable(level)`
//! gates a named level, `enter`/`exit` open and close a `tracing` span, and
//! stream insertion is a gated `tracing::event!`. Every call site follows
//! the convention `"t = [<globalTime>] --> <header>"` on entry.
//!
//! Behind the `debug-stream` feature (default-on in dev builds): with the
//! feature off, `enter`/`exit`/`write` compile to nothing, matching the
//! spec's "in non-debug builds all debug macros compile to no-ops".

use std::collections::HashSet;
use std::fmt;

use rtsim_types::prelude::*;

pub struct DebugStream {
    enabled: HashSet<String>,
    #[cfg(feature = "debug-stream")]
    depth: usize,
}

impl DebugStream {
    pub fn new() -> Self {
        Self {
            enabled: HashSet::new(),
            #[cfg(feature = "debug-stream")]
            depth: 0,
        }
    }

    pub fn enable(&mut self, level: impl Into<String>) {
        self.enabled.insert(level.into());
    }

    pub fn is_enabled(&self, level: &str) -> bool {
        self.enabled.contains(level)
    }

    #[cfg(feature = "debug-stream")]
    pub fn enter(&mut self, level: &'static str, header: &str, time: Tick) {
        if !self.is_enabled(level) {
            return;
        }
        tracing::debug_span!("sim.enter", level, header = %header).in_scope(|| {
            tracing::debug!("t = [{time}] --> {header}");
        });
        self.depth += 1;
    }

    #[cfg(not(feature = "debug-stream"))]
    pub fn enter(&mut self, _level: &'static str, _header: &str, _time: Tick) {}

    #[cfg(feature = "debug-stream")]
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[cfg(not(feature = "debug-stream"))]
    pub fn exit(&mut self) {}

    #[cfg(feature = "debug-stream")]
    pub fn write(&self, level: &'static str, args: fmt::Arguments<'_>) {
        if self.is_enabled(level) {
            tracing::debug!("{}", args);
        }
    }

    #[cfg(not(feature = "debug-stream"))]
    pub fn write(&self, _level: &'static str, _args: fmt::Arguments<'_>) {}
}

impl Default for DebugStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream-insertion-style logging: `dbg_write!(stream, "sched", "t={} foo", t)`.
#[macro_export]
macro_rules! dbg_write {
    ($stream:expr, $level:expr, $($arg:tt)*) => {
        $stream.write($level, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_level_is_not_enabled() {
        let stream = DebugStream::new();
        assert!(!stream.is_enabled("sched"));
    }

    #[test]
    fn enable_marks_level_enabled() {
        let mut stream = DebugStream::new();
        stream.enable("sched");
        assert!(stream.is_enabled("sched"));
        assert!(!stream.is_enabled("net"));
    }

    #[test]
    fn enter_exit_do_not_panic_without_enabling() {
        let mut stream = DebugStream::new();
        stream.enter("sched", "Task::dispatch", Tick::new(5));
        stream.exit();
    }
}
