//! # Tempo Shared
//! Common functionality shared between tempo-server & tempo-client crates:
//! snapshot buffers and interpolation, clock synchronization, the entity
//! registry, event emitters, and configuration types.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod clock_sync;
mod config;
mod entity;
mod error;
mod events;
mod pose;
mod registry;
mod snapshot;
mod types;

pub use clock_sync::{ClockRecord, ClockSyncError, ClockSyncStore, RemoteClock};
pub use config::{
    ConfigRegistry, EntityTypeConfig, ModelReplicationMode, PlayerReplicationMode,
    ReplicationConfig,
};
pub use entity::{
    Entity, EntityEvents, EntityId, ModelChanged, ModelHandle, Mount, OwnershipChanged,
    PushedSnapshot, RegistrationState,
};
pub use error::EntityError;
pub use events::{EventEmitter, ObserverKey};
pub use pose::{advance_pose, blend_pose, Pose};
pub use registry::EntityRegistry;
pub use snapshot::{AdvanceFn, BlendFn, PushOutcome, Snapshot, SnapshotBuffer, SnapshotConfig};
pub use types::{ClockDomain, TickRate, ViewerKey};
