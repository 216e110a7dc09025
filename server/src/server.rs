use std::collections::HashMap;
use std::mem;
use std::time::Instant;

use glam::Vec3;
use log::{info, warn};

use tempo_shared::{
    ClockDomain, ClockSyncError, ClockSyncStore, ConfigRegistry, EntityError, EntityId,
    EntityRegistry, PushOutcome, ViewerKey,
};

use crate::{
    events::ServerEvents,
    middleware::{InboundUpdate, MiddlewareFn, MiddlewarePipeline},
    scheduler::{OutboundSample, PositionSource, TickChange, TickScheduler, ViewerState},
    filter::ReplicationRules,
    stats::ServerStats,
};

/// The authoritative side of the replication system.
///
/// Owns the entity registry and composes the scheduler, replication
/// rules, middleware pipeline and per-viewer clock store. Inbound updates
/// are queued and drained once per tick; outbound samples are batched and
/// handed to the transport collaborator via [`take_outbound`].
///
/// [`take_outbound`]: ReplicationServer::take_outbound
pub struct ReplicationServer {
    registry: EntityRegistry,
    configs: ConfigRegistry,
    clocks: ClockSyncStore,
    rules: ReplicationRules,
    middleware: MiddlewarePipeline,
    scheduler: TickScheduler,
    stats: ServerStats,
    events: ServerEvents,
    viewers: HashMap<ViewerKey, Vec3>,
    position_source: Option<Box<dyn PositionSource + Send>>,
    inbound: Vec<InboundUpdate>,
    outbound: Vec<OutboundSample>,
}

impl ReplicationServer {
    pub fn new(configs: ConfigRegistry) -> Self {
        Self {
            registry: EntityRegistry::new(),
            configs,
            clocks: ClockSyncStore::new(),
            rules: ReplicationRules::new(),
            middleware: MiddlewarePipeline::new(),
            scheduler: TickScheduler::new(),
            stats: ServerStats::new(),
            events: ServerEvents::new(),
            viewers: HashMap::new(),
            position_source: None,
            inbound: Vec::new(),
            outbound: Vec::new(),
        }
    }

    // Viewer lifecycle

    pub fn connect_viewer(&mut self, viewer: ViewerKey) {
        info!("Viewer {} connected", viewer.to_u64());
        self.viewers.insert(viewer, Vec3::ZERO);
        self.events.push_viewer_connection(viewer);
    }

    /// Removes every trace of a viewer: clock record, character
    /// association, entity ownership, scheduler state. Pending work for
    /// the viewer is discarded, not deferred.
    pub fn disconnect_viewer(&mut self, viewer: &ViewerKey) {
        info!("Viewer {} disconnected", viewer.to_u64());
        self.viewers.remove(viewer);
        self.clocks.remove(viewer);
        self.registry.remove_viewer(viewer);
        self.scheduler.forget_viewer(viewer);
        self.events.push_viewer_disconnection(*viewer);
    }

    pub fn update_viewer_position(&mut self, viewer: ViewerKey, position: Vec3) {
        if let Some(stored) = self.viewers.get_mut(&viewer) {
            *stored = position;
        }
    }

    // Entity lifecycle

    /// Destroys an entity and drops any replication rule scoped to it.
    /// Entity handles are never reused, so a leftover entity rule would
    /// otherwise linger forever.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<(), EntityError> {
        self.registry.destroy(entity)?;
        self.rules.forget_entity(&entity);
        self.scheduler.forget_entity(&entity);
        Ok(())
    }

    // Clock synchronization

    /// Handles a sync message from a viewer: `local_sample` is the
    /// viewer's clock reading, `authoritative_now` this side's clock at
    /// arrival. Last-write-wins per viewer.
    pub fn sync_clock(&mut self, viewer: ViewerKey, local_sample: f64, authoritative_now: f64) {
        self.clocks.store(viewer, local_sample, authoritative_now);
    }

    pub fn convert_time(
        &self,
        viewer: &ViewerKey,
        time: f64,
        domain: ClockDomain,
    ) -> Result<f64, ClockSyncError> {
        self.clocks.convert_to(viewer, time, domain)
    }

    // Inbound

    /// Queues an inbound pose update; drained through the middleware
    /// pipeline on the next tick.
    pub fn queue_update(&mut self, update: InboundUpdate) {
        self.inbound.push(update);
    }

    /// Surfaces a malformed inbound message from the transport
    /// collaborator; follows the same path as a middleware rejection.
    pub fn reject_update(&mut self, viewer: ViewerKey, entity: EntityId) {
        self.stats.updates_rejected += 1;
        self.events.push_rejected_update(viewer, entity);
    }

    // Tick

    /// Runs one authoritative tick: drains queued inbound updates through
    /// the middleware pipeline into the snapshot buffers, then runs the
    /// tick-distance scheduler to batch outbound samples.
    pub fn tick(&mut self, now: f64) {
        let started = Instant::now();
        self.stats.begin_tick();

        let show_warnings = self.configs.global.show_warnings;
        for update in mem::take(&mut self.inbound) {
            if !self.middleware.evaluate(&update) {
                self.stats.updates_rejected += 1;
                self.events
                    .push_rejected_update(update.viewer, update.entity);
                if show_warnings {
                    warn!(
                        "Update for entity {} from viewer {} rejected by middleware",
                        update.entity.to_u64(),
                        update.viewer.to_u64()
                    );
                }
                continue;
            }

            // Sample timestamps cross the boundary in the sender's clock
            // domain; commit them in the authoritative domain.
            let timestamp = match self.clocks.convert_to(
                &update.viewer,
                update.timestamp,
                ClockDomain::Authoritative,
            ) {
                Ok(timestamp) => timestamp,
                Err(ClockSyncError::UnknownViewer { viewer }) => {
                    self.stats.updates_rejected += 1;
                    self.events
                        .push_rejected_update(update.viewer, update.entity);
                    if show_warnings {
                        warn!("Dropping update from viewer {viewer} with unsynced clock");
                    }
                    continue;
                }
                Err(_) => continue,
            };

            match self.registry.push_pose(update.entity, timestamp, update.pose) {
                Ok(PushOutcome::Inserted { .. }) => {}
                Ok(PushOutcome::OutOfRetention) => {
                    self.stats.updates_out_of_retention += 1;
                    if show_warnings {
                        warn!(
                            "Sample for entity {} fell out of the retention window",
                            update.entity.to_u64()
                        );
                    }
                }
                // Destroyed mid-flight; observe and no-op.
                Err(EntityError::NotFound { .. }) => {}
                Err(error) => {
                    self.stats.updates_rejected += 1;
                    if show_warnings {
                        warn!("Dropping inbound update: {error}");
                    }
                }
            }
        }

        let viewer_states: Vec<ViewerState> = self
            .viewers
            .iter()
            .map(|(key, position)| ViewerState {
                key: *key,
                position: *position,
                entity: self.registry.viewer_entity(key),
            })
            .collect();

        let mut changes: Vec<TickChange> = Vec::new();
        self.scheduler.tick(
            now,
            &mut self.registry,
            &self.configs,
            &self.rules,
            &viewer_states,
            self.position_source.as_deref(),
            &mut self.stats,
            &mut self.outbound,
            &mut changes,
        );
        self.events.push_tick_changes(&mut changes);

        self.stats.entities = self.registry.len();
        self.stats
            .record_tick_ms(started.elapsed().as_secs_f64() * 1000.0);
        self.events.push_tick(now);
    }

    /// Drains the outbound batch for the transport collaborator.
    pub fn take_outbound(&mut self) -> Vec<OutboundSample> {
        mem::take(&mut self.outbound)
    }

    // Middleware administration

    pub fn register_middleware(&mut self, name: impl Into<String>, priority: i32, func: MiddlewareFn) {
        self.middleware.register(name, priority, func);
    }

    pub fn unregister_middleware(&mut self, name: &str) -> bool {
        self.middleware.unregister(name)
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

    pub fn clocks(&self) -> &ClockSyncStore {
        &self.clocks
    }

    pub fn rules(&self) -> &ReplicationRules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut ReplicationRules {
        &mut self.rules
    }

    pub fn middleware(&self) -> &MiddlewarePipeline {
        &self.middleware
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn events_mut(&mut self) -> &mut ServerEvents {
        &mut self.events
    }

    pub fn set_position_source(&mut self, source: Box<dyn PositionSource + Send>) {
        self.position_source = Some(source);
    }
}
