/// Tests for the inbound middleware pipeline: priority order, rejection
/// semantics, name uniqueness, and the buffer-untouched guarantee.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use glam::Vec3;

use tempo_server::{InboundUpdate, MiddlewarePipeline, ReplicationServer};
use tempo_shared::{ConfigRegistry, EntityId, Pose, ViewerKey};

fn update(viewer: ViewerKey, entity: EntityId) -> InboundUpdate {
    InboundUpdate {
        viewer,
        entity,
        pose: Pose::from_position(Vec3::ONE),
        timestamp: 1.0,
        arrival_time: 1.05,
    }
}

fn spawn_one(server: &mut ReplicationServer) -> EntityId {
    server.registry_mut().spawn(None)
}

#[test]
fn rejection_aborts_the_chain() {
    let mut pipeline = MiddlewarePipeline::new();
    let ran_second = Arc::new(AtomicUsize::new(0));

    pipeline.register("reject", 1, Box::new(|_| false));
    {
        let ran_second = ran_second.clone();
        pipeline.register(
            "accept",
            2,
            Box::new(move |_| {
                ran_second.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
    }

    let viewer = ViewerKey::new(1);
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let entity = spawn_one(&mut server);

    assert!(!pipeline.evaluate(&update(viewer, entity)));
    assert_eq!(ran_second.load(Ordering::SeqCst), 0);
}

#[test]
fn priority_order_governs_not_registration_order() {
    // Register the accepting entry first but at the higher priority; the
    // rejecting entry still runs first and the update is still dropped.
    let mut pipeline = MiddlewarePipeline::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    {
        let order = order.clone();
        pipeline.register(
            "accept",
            2,
            Box::new(move |_| {
                order.lock().unwrap().push("accept");
                true
            }),
        );
    }
    {
        let order = order.clone();
        pipeline.register(
            "reject",
            1,
            Box::new(move |_| {
                order.lock().unwrap().push("reject");
                false
            }),
        );
    }

    let viewer = ViewerKey::new(1);
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let entity = spawn_one(&mut server);

    assert!(!pipeline.evaluate(&update(viewer, entity)));
    assert_eq!(*order.lock().unwrap(), vec!["reject"]);
}

#[test]
fn rejected_update_never_reaches_the_buffer() {
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let viewer = ViewerKey::new(1);
    let entity = spawn_one(&mut server);

    server.connect_viewer(viewer);
    server.sync_clock(viewer, 1.0, 1.0);
    server.register_middleware("reject", 1, Box::new(|_| false));
    server.register_middleware("accept", 2, Box::new(|_| true));

    server.queue_update(update(viewer, entity));
    server.tick(2.0);

    assert!(server
        .registry()
        .get_latest(&entity)
        .unwrap()
        .is_none());
    assert_eq!(server.stats().updates_rejected, 1);
    assert_eq!(
        server.events_mut().take_rejected_updates(),
        vec![(viewer, entity)]
    );
}

#[test]
fn duplicate_name_replaces_in_place() {
    let mut pipeline = MiddlewarePipeline::new();
    let old_runs = Arc::new(AtomicUsize::new(0));
    let new_runs = Arc::new(AtomicUsize::new(0));

    {
        let old_runs = old_runs.clone();
        pipeline.register(
            "validator",
            1,
            Box::new(move |_| {
                old_runs.fetch_add(1, Ordering::SeqCst);
                false
            }),
        );
    }
    {
        let new_runs = new_runs.clone();
        pipeline.register(
            "validator",
            5,
            Box::new(move |_| {
                new_runs.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
    }

    assert_eq!(pipeline.len(), 1);

    let viewer = ViewerKey::new(1);
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let entity = spawn_one(&mut server);

    assert!(pipeline.evaluate(&update(viewer, entity)));
    assert_eq!(old_runs.load(Ordering::SeqCst), 0);
    assert_eq!(new_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn unregister_removes_the_entry() {
    let mut pipeline = MiddlewarePipeline::new();

    pipeline.register("reject", 1, Box::new(|_| false));
    assert!(pipeline.contains("reject"));

    assert!(pipeline.unregister("reject"));
    assert!(!pipeline.contains("reject"));
    assert!(!pipeline.unregister("reject"));

    let viewer = ViewerKey::new(1);
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let entity = spawn_one(&mut server);

    // An empty pipeline accepts everything.
    assert!(pipeline.evaluate(&update(viewer, entity)));
}

#[test]
fn equal_priorities_keep_registration_order() {
    let mut pipeline = MiddlewarePipeline::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let order = order.clone();
        pipeline.register(
            name,
            3,
            Box::new(move |_| {
                order.lock().unwrap().push(name);
                true
            }),
        );
    }

    let viewer = ViewerKey::new(1);
    let mut server = ReplicationServer::new(ConfigRegistry::default());
    let entity = spawn_one(&mut server);

    assert!(pipeline.evaluate(&update(viewer, entity)));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}
