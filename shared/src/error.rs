use thiserror::Error;

/// Errors that can occur during entity registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Entity handle did not resolve to a live record. Destroyed handles
    /// are never reused, so operations against them land here and no-op.
    #[error("Entity {id} was not found in the registry")]
    NotFound { id: u64 },

    /// Mounted entities receive their rendered pose from the parent;
    /// direct pose pushes are mutually exclusive with the mount state.
    #[error("Entity {id} is mounted to {parent} and cannot receive direct pose pushes")]
    Mounted { id: u64, parent: u64 },

    /// Mounting would bind an entity to itself, directly or transitively.
    /// The call is rejected and entity state is unchanged.
    #[error("Mounting entity {id} to {parent} would create a mount cycle")]
    MountCycle { id: u64, parent: u64 },
}
