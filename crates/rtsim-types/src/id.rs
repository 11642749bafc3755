//! # rtsim-types::id
//!
//! Defines the core identifier types used throughout the kernel.
//! Using distinct types for different kinds of IDs helps prevent bugs where,
//! for example, an `EntityId` might be accidentally used as an `EventId`.

/// A unique identifier for an entity in the process-wide registry.
/// Assigned at registration time, in increasing order.
pub type EntityId = u64;

/// A unique identifier for an event, assigned once at construction and
/// stable across re-posts. This is the handle the event queue indexes by,
/// distinct from `order` (which changes on every `post`).
pub type EventId = u64;
