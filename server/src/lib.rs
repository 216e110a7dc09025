//! # Tempo Server
//! The authoritative side of the tempo replication system: decides which
//! entities produce fresh pose samples for which viewers (tick-distance
//! scheduling), filters visibility per (entity, viewer) pair, validates
//! inbound updates through an ordered middleware pipeline, and maintains
//! per-viewer clock offsets.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod events;
mod filter;
mod middleware;
mod scheduler;
mod server;
mod stats;

pub use events::ServerEvents;
pub use filter::{FilterMode, ReplicationRule, ReplicationRules, RulePredicate, RuleTarget};
pub use middleware::{InboundUpdate, MiddlewareFn, MiddlewarePipeline};
pub use scheduler::{
    classify, OutboundSample, PositionSource, TickChange, TickScheduler, ViewerState,
    SAMPLE_BYTES_FULL, SAMPLE_BYTES_YAW,
};
pub use server::ReplicationServer;
pub use stats::ServerStats;

pub use tempo_shared::{ClockDomain, ClockRecord, ClockSyncError, ClockSyncStore};
