//! # rtsim-cli::logging
//!
//! A human-readable formatter matching the kernel's own debug-stream
//! convention (`"t = [<time>] --> <header>"`, see `rtsim_engine::debug`)
//! instead of `tracing-subscriber`'s default line format. Simplified from
//! what a distributed-simulation CLI would need (no per-node coloring: a
//! single-threaded virtual-time kernel has no "which node logged this" axis
//! to highlight).

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FormatEvent, FormatFields},
    registry::LookupSpan,
};

/// Prefixes every line with wall-clock elapsed time and level; the
/// simulation-time prefix itself comes from the message text emitted by
/// `DebugStream`/`tracing::info!` call sites, not from this formatter.
pub struct SimulationFormatter {
    started: std::time::Instant,
}

impl SimulationFormatter {
    pub fn new() -> Self {
        Self {
            started: std::time::Instant::now(),
        }
    }
}

impl Default for SimulationFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for SimulationFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let elapsed = self.started.elapsed();
        let level = event.metadata().level();
        let level_color = match *level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            tracing::Level::DEBUG => "\x1b[34m",
            tracing::Level::TRACE => "\x1b[90m",
        };

        write!(writer, "\x1b[90m[{:>8.3}s]\x1b[0m ", elapsed.as_secs_f64())?;
        write!(writer, "{level_color}[{:>5}]\x1b[0m ", level)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
