//! Primitive types for the swarm tracker.
//!
//! These are the basic data structures shared by the tracker core, the wire
//! frontends and the storage implementations: infohashes, peer identifiers,
//! announce events and swarm counters.
use std::time::Duration;

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod swarm_metadata;

/// Duration since the Unix Epoch.
pub type DurationSinceUnixEpoch = Duration;
