use std::any::Any;

use glam::Vec3;

use crate::{
    config::ModelReplicationMode,
    events::EventEmitter,
    pose::Pose,
    snapshot::SnapshotBuffer,
    types::{TickRate, ViewerKey},
};

/// Handle identifying an entity in the registry. Monotonically assigned,
/// never reused within a process lifetime. Entities reference each other
/// (mounts, ownership) only by handle, never by direct reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to a visual representation owned by the scene/model
/// collaborator. The core never dereferences it; destruction of the
/// entity merely detaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u64);

/// A fixed relative offset binding one entity's rendered pose to
/// another's: rendered = parent's pose ∘ offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mount {
    pub parent: EntityId,
    pub offset: Pose,
}

/// One-way lifecycle: Registered -> Destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Registered,
    Destroyed,
}

/// Payload for the `OwnershipChanged` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnershipChanged {
    pub new_owner: Option<ViewerKey>,
    pub prev_owner: Option<ViewerKey>,
}

/// Payload for the `PushedSnapshot` event. `newest` is true when the
/// sample became the highest-timestamp entry of the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushedSnapshot {
    pub timestamp: f64,
    pub newest: bool,
}

/// Payload for the `ModelChanged` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelChanged {
    pub new_model: Option<ModelHandle>,
    pub prev_model: Option<ModelHandle>,
}

/// Per-entity event emitters, dispatched synchronously by the registry.
pub struct EntityEvents {
    pub destroying: EventEmitter<EntityId>,
    pub ownership_changed: EventEmitter<OwnershipChanged>,
    pub pushed_snapshot: EventEmitter<PushedSnapshot>,
    pub tick_changed: EventEmitter<TickRate>,
    pub lock_changed: EventEmitter<bool>,
    pub model_changed: EventEmitter<ModelChanged>,
    pub data_changed: EventEmitter<EntityId>,
}

impl EntityEvents {
    fn new() -> Self {
        Self {
            destroying: EventEmitter::new(),
            ownership_changed: EventEmitter::new(),
            pushed_snapshot: EventEmitter::new(),
            tick_changed: EventEmitter::new(),
            lock_changed: EventEmitter::new(),
            model_changed: EventEmitter::new(),
            data_changed: EventEmitter::new(),
        }
    }
}

/// A replicated entity record. All mutation is confined to methods on the
/// owning registry; the record itself exposes read access plus its event
/// emitters.
pub struct Entity {
    id: EntityId,
    type_name: Option<String>,
    state: RegistrationState,
    owner: Option<ViewerKey>,
    pub(crate) buffer: SnapshotBuffer<Pose, Vec3>,
    paused: bool,
    mount: Option<Mount>,
    model: Option<ModelHandle>,
    replication_mode: ModelReplicationMode,
    data: Option<Box<dyn Any + Send + Sync>>,
    pub events: EntityEvents,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        type_name: Option<String>,
        buffer: SnapshotBuffer<Pose, Vec3>,
        replication_mode: ModelReplicationMode,
    ) -> Self {
        Self {
            id,
            type_name,
            state: RegistrationState::Registered,
            owner: None,
            buffer,
            paused: false,
            mount: None,
            model: None,
            replication_mode,
            data: None,
            events: EntityEvents::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    pub fn destroyed(&self) -> bool {
        self.state == RegistrationState::Destroyed
    }

    /// The viewer authorized to produce authoritative pose updates for
    /// this entity, if any.
    pub fn owner(&self) -> Option<ViewerKey> {
        self.owner
    }

    /// Replication suspended, entity not destroyed.
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn mount(&self) -> Option<&Mount> {
        self.mount.as_ref()
    }

    pub fn model(&self) -> Option<ModelHandle> {
        self.model
    }

    pub fn replication_mode(&self) -> ModelReplicationMode {
        self.replication_mode
    }

    /// Whether the native-replication lock is active on the buffer.
    pub fn locked(&self) -> bool {
        self.buffer.locked()
    }

    pub fn buffer(&self) -> &SnapshotBuffer<Pose, Vec3> {
        &self.buffer
    }

    /// Custom application data attached to the entity.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    // Crate-internal mutators, driven by the registry.

    pub(crate) fn set_state(&mut self, state: RegistrationState) {
        self.state = state;
    }

    pub(crate) fn set_owner_raw(&mut self, owner: Option<ViewerKey>) {
        self.owner = owner;
    }

    pub(crate) fn set_paused_raw(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) fn set_mount_raw(&mut self, mount: Option<Mount>) {
        self.mount = mount;
    }

    pub(crate) fn set_model_raw(&mut self, model: Option<ModelHandle>) {
        self.model = model;
    }

    pub(crate) fn set_replication_mode_raw(&mut self, mode: ModelReplicationMode) {
        self.replication_mode = mode;
    }

    pub(crate) fn set_data_raw(&mut self, data: Option<Box<dyn Any + Send + Sync>>) {
        self.data = data;
    }
}
