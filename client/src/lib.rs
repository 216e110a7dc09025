//! # Tempo Client
//! The observer side of the tempo replication system: applies inbound
//! pose samples into per-entity snapshot buffers and serves jitter-
//! buffered, interpolated poses to the render loop.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod client;
mod stats;

pub use client::{ClientError, InboundSample, ReplicationClient};
pub use stats::ClientStats;

pub use tempo_shared::{ClockSyncError, RemoteClock};
