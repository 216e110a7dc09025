use std::mem;
use std::time::Instant;

use glam::Vec3;
use log::warn;
use thiserror::Error;

use crate::stats::ClientStats;

use tempo_shared::{
    ClockSyncError, ConfigRegistry, EntityError, EntityId, EntityRegistry, Pose, PushOutcome,
    RemoteClock,
};

/// Errors surfaced by observer-side queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Clock(#[from] ClockSyncError),

    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// A decoded sample delivered by the transport collaborator.
///
/// `entity` is the local registry handle; mapping remote ids to local
/// handles is the transport/session layer's concern. `timestamp` is in
/// the authoritative clock domain, as produced by the server.
#[derive(Debug, Clone, Copy)]
pub struct InboundSample {
    pub entity: EntityId,
    pub timestamp: f64,
    pub pose: Pose,
    pub velocity: Vec3,
}

/// The observer side of the replication system.
///
/// Owns its entity registry and a single offset to the authoritative
/// clock. Inbound samples are queued and drained once per frame, directly
/// into the snapshot buffers (no middleware on this direction); the
/// render loop queries interpolated poses at the target render time,
/// which sits one jitter-buffer behind the newest known sample.
pub struct ReplicationClient {
    registry: EntityRegistry,
    configs: ConfigRegistry,
    clock: RemoteClock,
    stats: ClientStats,
    inbound: Vec<InboundSample>,
}

impl ReplicationClient {
    pub fn new(configs: ConfigRegistry) -> Self {
        Self {
            registry: EntityRegistry::new(),
            configs,
            clock: RemoteClock::new(),
            stats: ClientStats::new(),
            inbound: Vec::new(),
        }
    }

    // Clock synchronization

    /// Handles a sync exchange: `local_sample` is this side's clock,
    /// `authoritative_sample` the server clock reading it carried.
    pub fn sync_clock(&mut self, local_sample: f64, authoritative_sample: f64) {
        self.clock.sync(local_sample, authoritative_sample);
    }

    pub fn clock(&self) -> &RemoteClock {
        &self.clock
    }

    // Inbound

    pub fn queue_sample(&mut self, sample: InboundSample) {
        self.inbound.push(sample);
    }

    /// Drains queued samples into the entity buffers. Runs once per
    /// render frame, bounding per-frame work.
    pub fn frame(&mut self, _now_local: f64) {
        let started = Instant::now();
        self.stats.begin_frame();
        let show_warnings = self.configs.global.show_warnings;

        for sample in mem::take(&mut self.inbound) {
            match self
                .registry
                .push_pose(sample.entity, sample.timestamp, sample.pose)
            {
                Ok(PushOutcome::Inserted { newest }) => {
                    self.stats.samples_applied += 1;
                    if newest {
                        self.stats.entities_moved_this_frame += 1;
                    }
                }
                Ok(PushOutcome::OutOfRetention) => {
                    self.stats.samples_out_of_retention += 1;
                    if show_warnings {
                        warn!(
                            "Late sample for entity {} fell out of the retention window",
                            sample.entity.to_u64()
                        );
                    }
                }
                // Entity despawned while the sample was in flight.
                Err(EntityError::NotFound { .. }) => {}
                Err(error) => {
                    if show_warnings {
                        warn!("Dropping inbound sample: {error}");
                    }
                }
            }
        }

        self.stats.total_entities = self.registry.len();
        self.stats
            .record_frame_ms(started.elapsed().as_secs_f64() * 1000.0);
    }

    // Queries

    /// The authoritative-domain time at which this entity should be
    /// rendered: now, converted through the clock offset, minus the
    /// type's interpolation delay (clamped to the global bounds). The
    /// delay absorbs network jitter so late samples still interpolate.
    pub fn target_render_time(
        &self,
        entity: &EntityId,
        now_local: f64,
    ) -> Result<f64, ClientError> {
        let record = self
            .registry
            .entity(entity)
            .ok_or(EntityError::NotFound {
                id: entity.to_u64(),
            })?;
        let delay = self.configs.interp_delay(record.type_name());
        Ok(self.clock.to_authoritative(now_local)? - delay)
    }

    /// Interpolated pose at the target render time, with mount
    /// resolution. `Ok(None)` means nothing has been replicated yet.
    pub fn sample(&mut self, entity: &EntityId, now_local: f64) -> Result<Option<Pose>, ClientError> {
        let target = self.target_render_time(entity, now_local)?;
        self.stats.entities_checked_this_frame += 1;
        Ok(self.registry.get_at(entity, target, false)?)
    }

    /// Latest raw pose, bypassing interpolation.
    pub fn latest_pose(&self, entity: &EntityId) -> Result<Option<Pose>, ClientError> {
        Ok(self.registry.get_latest(entity)?.map(|s| s.value))
    }

    // Accessors

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut ConfigRegistry {
        &mut self.configs
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }
}
