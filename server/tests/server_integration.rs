/// End-to-end tests for the authoritative tick loop: inbound updates
/// through middleware and clock conversion, outbound batching, and
/// viewer lifecycle.
use std::collections::HashMap;

use glam::Vec3;

use tempo_server::{
    InboundUpdate, PositionSource, ReplicationRule, ReplicationServer, RuleTarget,
};
use tempo_shared::{ClockDomain, ConfigRegistry, EntityId, Pose, ViewerKey};

fn update(viewer: ViewerKey, entity: EntityId, timestamp: f64, position: Vec3) -> InboundUpdate {
    InboundUpdate {
        viewer,
        entity,
        pose: Pose::from_position(position),
        timestamp,
        arrival_time: timestamp + 0.05,
    }
}

#[test]
fn inbound_update_lands_in_the_authoritative_domain() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    // offset = authoritative - local = 90
    server.sync_clock(viewer, 10.0, 100.0);

    server.queue_update(update(viewer, entity, 11.0, Vec3::X));
    server.tick(101.0);

    let latest = server.registry().get_latest(&entity).unwrap().unwrap();
    assert_eq!(latest.timestamp, 101.0);
    assert_eq!(latest.value.position, Vec3::X);
}

#[test]
fn update_from_unsynced_viewer_is_rejected() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    // No sync_clock call for this viewer.
    server.queue_update(update(viewer, entity, 11.0, Vec3::X));
    server.tick(101.0);

    assert!(server.registry().get_latest(&entity).unwrap().is_none());
    assert_eq!(server.stats().updates_rejected, 1);
    assert_eq!(
        server.events_mut().take_rejected_updates(),
        vec![(viewer, entity)]
    );
}

#[test]
fn outbound_reaches_other_viewers_but_not_the_owner() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let owner = ViewerKey::new(1);
    let spectator = ViewerKey::new(2);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(owner);
    server.connect_viewer(spectator);
    server.sync_clock(owner, 100.0, 100.0);
    server.registry_mut().set_owner(entity, Some(owner)).unwrap();
    server.update_viewer_position(owner, Vec3::ZERO);
    server.update_viewer_position(spectator, Vec3::new(5.0, 0.0, 0.0));

    server.queue_update(update(owner, entity, 100.5, Vec3::ONE));
    server.tick(101.0);

    let outbound = server.take_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].viewer, spectator);
    assert_eq!(outbound[0].entity, entity);

    // The batch was drained.
    assert!(server.take_outbound().is_empty());
}

#[test]
fn update_for_destroyed_entity_is_quietly_dropped() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    server.sync_clock(viewer, 100.0, 100.0);

    // The update is in flight when the entity goes away.
    server.queue_update(update(viewer, entity, 100.5, Vec3::ONE));
    server.registry_mut().destroy(entity).unwrap();
    server.tick(101.0);

    assert_eq!(server.stats().updates_rejected, 0);
    assert!(server.events_mut().take_rejected_updates().is_empty());
}

#[test]
fn disconnect_clears_clock_ownership_and_schedule() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    server.sync_clock(viewer, 100.0, 100.0);
    server.registry_mut().set_owner(entity, Some(viewer)).unwrap();

    server.disconnect_viewer(&viewer);

    assert!(server
        .convert_time(&viewer, 1.0, ClockDomain::Authoritative)
        .is_err());
    assert_eq!(server.registry().entity(&entity).unwrap().owner(), None);
    assert_eq!(
        server.events_mut().take_viewer_disconnections(),
        vec![viewer]
    );
}

#[test]
fn tick_events_accumulate_until_drained() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());

    server.tick(1.0);
    server.tick(2.0);

    assert_eq!(server.events_mut().take_ticks(), vec![1.0, 2.0]);
    assert!(server.events_mut().take_ticks().is_empty());
}

struct FixedPositions {
    positions: HashMap<EntityId, Vec3>,
}

impl PositionSource for FixedPositions {
    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }
}

#[test]
fn position_source_overrides_snapshot_positions() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    server.update_viewer_position(viewer, Vec3::ZERO);

    // The last sample puts the entity far beyond the half threshold.
    server
        .registry_mut()
        .push_pose(entity, 0.5, Pose::from_position(Vec3::new(1000.0, 0.0, 0.0)))
        .unwrap();

    // The scene reports it right next to the viewer.
    let mut positions = HashMap::new();
    positions.insert(entity, Vec3::new(1.0, 0.0, 0.0));
    server.set_position_source(Box::new(FixedPositions { positions }));

    server.tick(1.0);

    let outbound = server.take_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].viewer, viewer);
    assert_eq!(outbound[0].entity, entity);
}

#[test]
fn destroying_an_entity_drops_its_replication_rule() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.rules_mut().set_rule(
        RuleTarget::Entity(entity),
        Some(ReplicationRule::include([])),
    );
    assert!(!server.rules().allows(entity, None, viewer, None));

    server.destroy_entity(entity).unwrap();

    // Handles are never reused; a leftover rule would linger forever.
    assert!(server.rules().allows(entity, None, viewer, None));
    assert!(server.scheduler().pair_rate(&entity, &viewer).is_none());
    assert!(!server.registry().contains(&entity));
}

#[test]
fn stale_inbound_sample_is_counted_not_fatal() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = server.registry_mut().spawn(None);

    server.connect_viewer(viewer);
    server.sync_clock(viewer, 100.0, 100.0);

    server.queue_update(update(viewer, entity, 100.0, Vec3::X));
    server.queue_update(update(viewer, entity, 101.0, Vec3::Y));
    // Two seconds behind the retained window's oldest sample.
    server.queue_update(update(viewer, entity, 98.0, Vec3::Z));
    server.tick(101.0);

    assert_eq!(server.stats().updates_out_of_retention, 1);
    let latest = server.registry().get_latest(&entity).unwrap().unwrap();
    assert_eq!(latest.timestamp, 101.0);
}
