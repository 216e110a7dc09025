use std::any::Any;
use std::collections::HashMap;

use glam::Vec3;
use log::info;

use crate::{
    config::ModelReplicationMode,
    entity::{
        Entity, EntityId, ModelChanged, ModelHandle, Mount, OwnershipChanged, PushedSnapshot,
        RegistrationState,
    },
    error::EntityError,
    events::EventEmitter,
    pose::{advance_pose, blend_pose, Pose},
    snapshot::{PushOutcome, Snapshot, SnapshotBuffer, SnapshotConfig},
    types::ViewerKey,
};

/// Arena of entity records keyed by monotonically increasing handles.
///
/// Owns entity identity, lifecycle, ownership and mounts, and composes the
/// per-entity snapshot buffers. Handles are never reused: operations
/// against a destroyed entity resolve to [`EntityError::NotFound`] and
/// no-op, which makes destruction safe to perform mid-tick.
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
    next_id: u64,
    viewer_entities: HashMap<ViewerKey, EntityId>,
    model_index: HashMap<ModelHandle, EntityId>,
    entity_added: EventEmitter<EntityId>,
    entity_removed: EventEmitter<EntityId>,
    owner_assigned: EventEmitter<(ViewerKey, EntityId)>,
    owner_revoked: EventEmitter<(ViewerKey, EntityId)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 0,
            viewer_entities: HashMap::new(),
            model_index: HashMap::new(),
            entity_added: EventEmitter::new(),
            entity_removed: EventEmitter::new(),
            owner_assigned: EventEmitter::new(),
            owner_revoked: EventEmitter::new(),
        }
    }

    // Lifecycle

    /// Registers a new entity and returns its handle.
    pub fn spawn(&mut self, type_name: Option<&str>) -> EntityId {
        self.spawn_with_config(type_name, SnapshotConfig::default())
    }

    /// Registers a new entity with an explicit snapshot buffer
    /// configuration.
    pub fn spawn_with_config(
        &mut self,
        type_name: Option<&str>,
        snapshot_config: SnapshotConfig,
    ) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let buffer = SnapshotBuffer::with_config(blend_pose, advance_pose, snapshot_config);
        let entity = Entity::new(
            id,
            type_name.map(str::to_owned),
            buffer,
            ModelReplicationMode::Native,
        );
        self.entities.insert(id, entity);

        self.entity_added.emit(&id);
        id
    }

    /// Destroys an entity: fires `Destroying`, detaches the model, drops
    /// the record. The handle is never reused; in-flight work referencing
    /// it observes `NotFound` and no-ops.
    pub fn destroy(&mut self, id: EntityId) -> Result<(), EntityError> {
        let (model, owner) = {
            let entity = self.get_mut(&id)?;
            entity.set_state(RegistrationState::Destroyed);
            entity.events.destroying.emit(&id);
            (entity.model(), entity.owner())
        };

        if let Some(model) = model {
            self.model_index.remove(&model);
        }
        if let Some(owner) = owner {
            self.owner_revoked.emit(&(owner, id));
        }
        self.viewer_entities.retain(|_, entity_id| *entity_id != id);
        self.entities.remove(&id);

        info!("Entity {} destroyed", id.to_u64());
        self.entity_removed.emit(&id);
        Ok(())
    }

    // Lookup

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Snapshot of live handles, for iteration that may destroy entities
    /// mid-pass.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn get(&self, id: &EntityId) -> Result<&Entity, EntityError> {
        self.entities
            .get(id)
            .ok_or(EntityError::NotFound { id: id.to_u64() })
    }

    fn get_mut(&mut self, id: &EntityId) -> Result<&mut Entity, EntityError> {
        self.entities
            .get_mut(id)
            .ok_or(EntityError::NotFound { id: id.to_u64() })
    }

    // Pose history

    /// Pushes an authoritative pose sample. The velocity estimate is
    /// derived from the nearest earlier retained sample. Rejected while
    /// the entity is mounted: mount and direct-push are mutually
    /// exclusive.
    pub fn push_pose(
        &mut self,
        id: EntityId,
        timestamp: f64,
        pose: Pose,
    ) -> Result<PushOutcome, EntityError> {
        let entity = self.get_mut(&id)?;

        if let Some(mount) = entity.mount() {
            return Err(EntityError::Mounted {
                id: id.to_u64(),
                parent: mount.parent.to_u64(),
            });
        }

        let velocity = match entity.buffer.get_before(timestamp) {
            Some(prev) if timestamp > prev.timestamp => {
                (pose.position - prev.value.position) / (timestamp - prev.timestamp) as f32
            }
            _ => Vec3::ZERO,
        };

        let outcome = entity.buffer.push(timestamp, pose, velocity);
        if let PushOutcome::Inserted { newest } = outcome {
            entity
                .events
                .pushed_snapshot
                .emit(&PushedSnapshot { timestamp, newest });
        }
        Ok(outcome)
    }

    /// Latest raw sample for an entity, `None` if never replicated.
    pub fn get_latest(&self, id: &EntityId) -> Result<Option<Snapshot<Pose, Vec3>>, EntityError> {
        Ok(self.get(id)?.buffer.get_latest().copied())
    }

    /// Interpolated pose at `at`, resolving mount chains: a mounted
    /// entity's rendered pose is its parent's pose composed with the
    /// fixed offset. Returns `Ok(None)` when no pose data exists yet.
    pub fn get_at(
        &self,
        id: &EntityId,
        at: f64,
        bypass_lock: bool,
    ) -> Result<Option<Pose>, EntityError> {
        let mut current = self.get(id)?;
        let mut offset = Pose::IDENTITY;
        let mut visited = vec![*id];

        while let Some(mount) = current.mount() {
            if visited.contains(&mount.parent) {
                break;
            }
            let Some(parent) = self.entities.get(&mount.parent) else {
                // Parent destroyed out from under the mount; fall back to
                // the child's own history.
                break;
            };
            offset = mount.offset.transform(&offset);
            visited.push(mount.parent);
            current = parent;
        }

        Ok(current
            .buffer
            .get_at(at, bypass_lock)
            .map(|base| base.transform(&offset)))
    }

    /// Empties an entity's snapshot buffer.
    pub fn clear_buffer(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.get_mut(&id)?.buffer.clear();
        Ok(())
    }

    // Replication control

    pub fn pause(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.get_mut(&id)?.set_paused_raw(true);
        Ok(())
    }

    pub fn resume(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.get_mut(&id)?.set_paused_raw(false);
        Ok(())
    }

    /// Sets or clears the native-replication lock, firing `LockChanged`
    /// on actual change only.
    pub fn set_locked(&mut self, id: EntityId, locked: bool) -> Result<(), EntityError> {
        let entity = self.get_mut(&id)?;
        if entity.buffer.locked() != locked {
            entity.buffer.set_locked(locked);
            entity.events.lock_changed.emit(&locked);
        }
        Ok(())
    }

    // Ownership

    /// Reassigns the network owner. Applied synchronously between ticks,
    /// so no tick observes two owners for the same entity.
    pub fn set_owner(
        &mut self,
        id: EntityId,
        owner: Option<ViewerKey>,
    ) -> Result<(), EntityError> {
        let prev = {
            let entity = self.get_mut(&id)?;
            let prev = entity.owner();
            if prev == owner {
                return Ok(());
            }
            entity.set_owner_raw(owner);
            entity.events.ownership_changed.emit(&OwnershipChanged {
                new_owner: owner,
                prev_owner: prev,
            });
            prev
        };

        if let Some(prev_owner) = prev {
            self.owner_revoked.emit(&(prev_owner, id));
        }
        if let Some(new_owner) = owner {
            self.owner_assigned.emit(&(new_owner, id));
        }
        Ok(())
    }

    // Mounts

    /// Mounts `id` onto `parent` with a fixed offset. Self-mounts and
    /// transitive cycles are rejected at call time, entity state
    /// unchanged.
    pub fn set_mount(
        &mut self,
        id: EntityId,
        parent: EntityId,
        offset: Pose,
    ) -> Result<(), EntityError> {
        if id == parent {
            return Err(EntityError::MountCycle {
                id: id.to_u64(),
                parent: parent.to_u64(),
            });
        }
        self.get(&id)?;

        // Walk the prospective parent chain; reaching `id` means a cycle.
        let mut cursor = parent;
        loop {
            let record = self.get(&cursor)?;
            match record.mount() {
                Some(mount) if mount.parent == id => {
                    return Err(EntityError::MountCycle {
                        id: id.to_u64(),
                        parent: parent.to_u64(),
                    });
                }
                Some(mount) => cursor = mount.parent,
                None => break,
            }
        }

        self.get_mut(&id)?
            .set_mount_raw(Some(Mount { parent, offset }));
        Ok(())
    }

    pub fn clear_mount(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.get_mut(&id)?.set_mount_raw(None);
        Ok(())
    }

    // Models

    /// Attaches or detaches the visual representation handle, firing
    /// `ModelChanged` and maintaining the model lookup index.
    pub fn set_model(
        &mut self,
        id: EntityId,
        model: Option<ModelHandle>,
        mode: ModelReplicationMode,
    ) -> Result<(), EntityError> {
        let prev = {
            let entity = self.get_mut(&id)?;
            let prev = entity.model();
            entity.set_model_raw(model);
            entity.set_replication_mode_raw(mode);
            entity.events.model_changed.emit(&ModelChanged {
                new_model: model,
                prev_model: prev,
            });
            prev
        };

        if let Some(prev_model) = prev {
            self.model_index.remove(&prev_model);
        }
        if let Some(new_model) = model {
            self.model_index.insert(new_model, id);
        }
        Ok(())
    }

    pub fn entity_from_model(&self, model: &ModelHandle) -> Option<EntityId> {
        self.model_index.get(model).copied()
    }

    // Custom data

    pub fn set_data(
        &mut self,
        id: EntityId,
        data: Box<dyn Any + Send + Sync>,
    ) -> Result<(), EntityError> {
        let entity = self.get_mut(&id)?;
        entity.set_data_raw(Some(data));
        entity.events.data_changed.emit(&id);
        Ok(())
    }

    // Viewer characters

    /// Associates a viewer with an entity as their character.
    pub fn set_viewer_entity(
        &mut self,
        viewer: ViewerKey,
        id: EntityId,
    ) -> Result<(), EntityError> {
        self.get(&id)?;
        self.viewer_entities.insert(viewer, id);
        Ok(())
    }

    pub fn remove_viewer_entity(&mut self, viewer: &ViewerKey) -> Option<EntityId> {
        self.viewer_entities.remove(viewer)
    }

    pub fn viewer_entity(&self, viewer: &ViewerKey) -> Option<EntityId> {
        self.viewer_entities.get(viewer).copied()
    }

    /// Full cleanup for a disconnecting viewer: drops the character
    /// association and releases ownership of every entity they owned.
    pub fn remove_viewer(&mut self, viewer: &ViewerKey) {
        self.viewer_entities.remove(viewer);

        let owned: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.owner() == Some(*viewer))
            .map(|(id, _)| *id)
            .collect();
        for id in owned {
            // Entity exists; ignore the impossible error.
            let _ = self.set_owner(id, None);
        }
    }

    // Registry-level events

    pub fn on_entity_added(&mut self) -> &mut EventEmitter<EntityId> {
        &mut self.entity_added
    }

    pub fn on_entity_removed(&mut self) -> &mut EventEmitter<EntityId> {
        &mut self.entity_removed
    }

    pub fn on_owner_assigned(&mut self) -> &mut EventEmitter<(ViewerKey, EntityId)> {
        &mut self.owner_assigned
    }

    pub fn on_owner_revoked(&mut self) -> &mut EventEmitter<(ViewerKey, EntityId)> {
        &mut self.owner_revoked
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
