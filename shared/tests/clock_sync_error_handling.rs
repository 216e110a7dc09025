/// Tests for clock synchronization: round-trip identity, last-write-wins
/// updates, and the unknown-viewer error path.
use tempo_shared::{ClockDomain, ClockSyncError, ClockSyncStore, RemoteClock, ViewerKey};

#[test]
fn conversion_round_trip_is_identity() {
    let mut store = ClockSyncStore::new();
    let viewer = ViewerKey::new(1);

    store.store(viewer, 100.0, 250.0);

    let local = store
        .convert_to(&viewer, 300.0, ClockDomain::Viewer)
        .unwrap();
    let back = store
        .convert_to(&viewer, local, ClockDomain::Authoritative)
        .unwrap();
    assert_eq!(back, 300.0);
}

#[test]
fn conversion_applies_stored_offset() {
    let mut store = ClockSyncStore::new();
    let viewer = ViewerKey::new(1);

    // offset = authoritative - local = 150
    store.store(viewer, 100.0, 250.0);
    assert_eq!(store.record(&viewer).unwrap().offset, 150.0);

    assert_eq!(
        store
            .convert_to(&viewer, 10.0, ClockDomain::Authoritative)
            .unwrap(),
        160.0
    );
    assert_eq!(
        store.convert_to(&viewer, 160.0, ClockDomain::Viewer).unwrap(),
        10.0
    );
}

#[test]
fn store_is_last_write_wins() {
    let mut store = ClockSyncStore::new();
    let viewer = ViewerKey::new(1);

    store.store(viewer, 100.0, 250.0);
    store.store(viewer, 100.0, 260.0);

    // No averaging: the newest offset replaces the old one.
    assert_eq!(store.record(&viewer).unwrap().offset, 160.0);
}

#[test]
fn unknown_viewer_is_an_error_not_a_pass_through() {
    let store = ClockSyncStore::new();
    let viewer = ViewerKey::new(42);

    let result = store.convert_to(&viewer, 5.0, ClockDomain::Viewer);
    assert_eq!(result, Err(ClockSyncError::UnknownViewer { viewer: 42 }));
}

#[test]
fn removed_viewer_must_resync() {
    let mut store = ClockSyncStore::new();
    let viewer = ViewerKey::new(1);

    store.store(viewer, 100.0, 250.0);
    assert!(store.remove(&viewer).is_some());

    assert!(matches!(
        store.convert_to(&viewer, 5.0, ClockDomain::Viewer),
        Err(ClockSyncError::UnknownViewer { .. })
    ));
}

#[test]
fn remote_clock_requires_sync() {
    let mut clock = RemoteClock::new();

    assert_eq!(clock.to_authoritative(10.0), Err(ClockSyncError::NotSynced));
    assert!(!clock.is_synced());

    clock.sync(100.0, 250.0);
    assert!(clock.is_synced());
    assert_eq!(clock.to_authoritative(110.0).unwrap(), 260.0);
    assert_eq!(clock.to_local(260.0).unwrap(), 110.0);
}
