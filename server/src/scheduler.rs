use std::collections::HashMap;

use glam::Vec3;

use tempo_shared::{ConfigRegistry, EntityId, EntityRegistry, Pose, TickRate, ViewerKey};

use crate::{filter::ReplicationRules, stats::ServerStats};

/// Estimated wire size of one outbound sample carrying a full rotation.
pub const SAMPLE_BYTES_FULL: usize = 44;
/// Estimated wire size of one outbound sample carrying yaw only.
pub const SAMPLE_BYTES_YAW: usize = 32;

/// Supplies current world positions for distance checks. Implemented by
/// the scene/model collaborator; the scheduler falls back to the last
/// known snapshot position when no source is given.
pub trait PositionSource {
    fn position(&self, entity: EntityId) -> Option<Vec3>;
}

/// Per-tick view of one observer.
#[derive(Debug, Clone, Copy)]
pub struct ViewerState {
    pub key: ViewerKey,
    pub position: Vec3,
    /// The viewer's own character entity, if any.
    pub entity: Option<EntityId>,
}

/// A sample scheduled for delivery to one viewer. The transport
/// collaborator serializes and sends these.
#[derive(Debug, Clone, Copy)]
pub struct OutboundSample {
    pub viewer: ViewerKey,
    pub entity: EntityId,
    pub timestamp: f64,
    pub pose: Pose,
    pub velocity: Vec3,
    pub full_rotation: bool,
}

/// A (entity, viewer) pair's tick rate actually changed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickChange {
    pub entity: EntityId,
    pub viewer: ViewerKey,
    pub rate: TickRate,
}

/// Pure classification of a pair from distance and thresholds
/// (`normal_distance < half_distance`). Same inputs, same class.
pub fn classify(distance: f32, normal_distance: f32, half_distance: f32) -> TickRate {
    if distance <= normal_distance {
        TickRate::Normal
    } else if distance <= half_distance {
        TickRate::Half
    } else {
        TickRate::None
    }
}

struct EntityInfo {
    id: EntityId,
    type_name: Option<String>,
    position: Vec3,
    sample: Option<(f64, Pose, Vec3)>,
    full_rotation: bool,
    min_interval: f64,
    owner: Option<ViewerKey>,
}

/// Decides, per tick, which entities must produce a fresh sample for
/// which viewers, based on viewer-entity distance and per-type cadence.
///
/// Distance is measured from last-known (not predicted) positions so the
/// decision is deterministic and side-effect-free. Paused and mounted
/// entities are skipped entirely; state for pairs that disappear
/// (destroyed entities, removed viewers) is discarded, not deferred.
pub struct TickScheduler {
    frame: u64,
    pair_rates: HashMap<(EntityId, ViewerKey), TickRate>,
    entity_rates: HashMap<EntityId, TickRate>,
    // (send time, sent sample timestamp) per pair
    last_sent: HashMap<(EntityId, ViewerKey), (f64, f64)>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            frame: 0,
            pair_rates: HashMap::new(),
            entity_rates: HashMap::new(),
            last_sent: HashMap::new(),
        }
    }

    /// Current classification for a pair, if it was evaluated last tick.
    pub fn pair_rate(&self, entity: &EntityId, viewer: &ViewerKey) -> Option<TickRate> {
        self.pair_rates.get(&(*entity, *viewer)).copied()
    }

    /// Discards pending state for a removed viewer.
    pub fn forget_viewer(&mut self, viewer: &ViewerKey) {
        self.pair_rates.retain(|(_, v), _| v != viewer);
        self.last_sent.retain(|(_, v), _| v != viewer);
    }

    /// Discards pending state for a destroyed entity.
    pub fn forget_entity(&mut self, entity: &EntityId) {
        self.pair_rates.retain(|(e, _), _| e != entity);
        self.entity_rates.remove(entity);
        self.last_sent.retain(|(e, _), _| e != entity);
    }

    /// Runs one scheduler pass. Appends due samples to `out_samples` and
    /// actual rate transitions to `out_changes`; fires each entity's
    /// `TickChanged` emitter when its overall rate (the highest rate over
    /// all viewers) changes.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        now: f64,
        registry: &mut EntityRegistry,
        configs: &ConfigRegistry,
        rules: &ReplicationRules,
        viewers: &[ViewerState],
        positions: Option<&(dyn PositionSource + Send)>,
        stats: &mut ServerStats,
        out_samples: &mut Vec<OutboundSample>,
        out_changes: &mut Vec<TickChange>,
    ) {
        self.frame = self.frame.wrapping_add(1);
        let half_frame = self.frame % 2 == 0;
        let budget = configs.global.max_bytes_per_frame_per_viewer;

        // Gather phase: read-only snapshot of every schedulable entity.
        let mut infos: Vec<EntityInfo> = Vec::new();
        for id in registry.ids() {
            let Some(entity) = registry.entity(&id) else {
                continue;
            };
            if entity.paused() || entity.mount().is_some() {
                continue;
            }

            let sample = entity
                .buffer()
                .get_latest()
                .map(|s| (s.timestamp, s.value, s.velocity));
            let position = positions
                .and_then(|p| p.position(id))
                .or(sample.map(|(_, pose, _)| pose.position));
            let Some(position) = position else {
                // No last-known position at all; nothing to measure.
                continue;
            };

            let type_config = configs.resolve(entity.type_name());
            infos.push(EntityInfo {
                id,
                type_name: entity.type_name().map(str::to_owned),
                position,
                sample,
                full_rotation: configs.full_rotation(entity.type_name()),
                min_interval: if type_config.tick_rate > 0.0 {
                    1.0 / type_config.tick_rate
                } else {
                    0.0
                },
                owner: entity.owner(),
            });
        }

        // Classification phase.
        let mut new_pair_rates: HashMap<(EntityId, ViewerKey), TickRate> = HashMap::new();
        let mut new_entity_rates: HashMap<EntityId, TickRate> = HashMap::new();
        let mut spent: HashMap<ViewerKey, usize> = HashMap::new();

        for info in &infos {
            let (normal_distance, half_distance) = configs.tick_distances(info.type_name.as_deref());
            let mut entity_rate = TickRate::None;
            let mut classified = false;

            for viewer in viewers {
                // The owner produces this entity's updates; never echo
                // samples back at them.
                if info.owner == Some(viewer.key) {
                    continue;
                }
                if !rules.allows(info.id, info.type_name.as_deref(), viewer.key, viewer.entity) {
                    continue;
                }

                let distance = info.position.distance(viewer.position);
                let rate = classify(distance, normal_distance, half_distance);
                let pair = (info.id, viewer.key);

                classified = true;
                if rate_exceeds(rate, entity_rate) {
                    entity_rate = rate;
                }

                let prev = self.pair_rates.get(&pair).copied();
                if prev != Some(rate) {
                    out_changes.push(TickChange {
                        entity: info.id,
                        viewer: viewer.key,
                        rate,
                    });
                }
                new_pair_rates.insert(pair, rate);

                match rate {
                    TickRate::Normal => stats.full_ticked += 1,
                    TickRate::Half => stats.half_ticked += 1,
                    TickRate::None => stats.non_ticked += 1,
                }

                let due = match rate {
                    TickRate::Normal => true,
                    TickRate::Half => half_frame,
                    TickRate::None => false,
                };
                if !due {
                    continue;
                }

                let Some((timestamp, pose, velocity)) = info.sample else {
                    continue;
                };
                // Per-type cadence: never exceed the configured rate even
                // when the scheduler runs faster. An idle entity's
                // unchanged sample is sent once, not repeated.
                if let Some((last_time, last_sample)) = self.last_sent.get(&pair) {
                    if now - last_time < info.min_interval - 1e-9 {
                        continue;
                    }
                    if timestamp <= *last_sample {
                        continue;
                    }
                }

                let cost = if info.full_rotation {
                    SAMPLE_BYTES_FULL
                } else {
                    SAMPLE_BYTES_YAW
                };
                let used = spent.entry(viewer.key).or_insert(0);
                if budget > 0 && *used + cost > budget {
                    stats.culled_by_budget += 1;
                    continue;
                }
                *used += cost;

                self.last_sent.insert(pair, (now, timestamp));
                out_samples.push(OutboundSample {
                    viewer: viewer.key,
                    entity: info.id,
                    timestamp,
                    pose: if info.full_rotation {
                        pose
                    } else {
                        pose.yaw_only()
                    },
                    velocity,
                    full_rotation: info.full_rotation,
                });
                stats.samples_sent += 1;
                stats.bytes_sent_estimate += cost as u64;
            }

            if classified {
                new_entity_rates.insert(info.id, entity_rate);
            }
        }

        // Fire per-entity TickChanged on overall-rate transitions only.
        for (id, rate) in &new_entity_rates {
            if self.entity_rates.get(id) != Some(rate) {
                if let Some(entity) = registry.entity_mut(id) {
                    entity.events.tick_changed.emit(rate);
                }
            }
        }

        // Pairs not seen this tick (gone viewers/entities) are discarded.
        self.pair_rates = new_pair_rates;
        self.entity_rates = new_entity_rates;
        let pair_rates = &self.pair_rates;
        self.last_sent.retain(|pair, _| pair_rates.contains_key(pair));
    }
}

fn rate_exceeds(a: TickRate, b: TickRate) -> bool {
    rank(a) > rank(b)
}

fn rank(rate: TickRate) -> u8 {
    match rate {
        TickRate::None => 0,
        TickRate::Half => 1,
        TickRate::Normal => 2,
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}
