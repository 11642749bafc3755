//! # rtsim-types::errors
//!
//! Defines the error taxonomy used throughout the kernel: every distinct
//! failure mode the engine can surface is a variant here, so call sites
//! match on one type instead of juggling several ad-hoc ones.

use crate::time::Tick;
use thiserror::Error;

/// The kernel's single error type.
#[derive(Error, Debug)]
pub enum SimError {
    /// `post()` called on an event that is already enqueued.
    #[error("event {event_id} is already in the queue; drop() it before re-posting")]
    QueueDuplicate { event_id: u64 },

    /// `post(at)` called with `at` earlier than the current global time.
    #[error("cannot post at {at} when global time is already {now}")]
    PostInPast { at: Tick, now: Tick },

    /// The driver's queue emptied before the requested horizon was reached.
    /// Not fatal: callers treat this as normal termination of a replica.
    #[error("no more events in the queue")]
    NoMoreEvents,

    /// `Entity::find(name)` found no registered entity with that name.
    #[error("no entity registered under name '{0}'")]
    NotFound(String),

    /// A scripted `createInstance(params)` factory call had the wrong arity
    /// or a malformed argument.
    #[error("wrong number of parameters for '{class_name}'")]
    ParseExc { class_name: String },

    /// An instruction's task has no kernel, or the kernel does not satisfy
    /// the capability the instruction needs (e.g. `RTKernel`).
    #[error("task has no kernel satisfying the required capability")]
    KernelMismatch,

    /// I/O failure underlying a `Det` random variable's file source, or a
    /// malformed probability distribution file.
    #[error("I/O error: {0}")]
    IoExc(#[from] std::io::Error),
}
