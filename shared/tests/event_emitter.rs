/// Tests for the observer-list event system: connect, once, disconnect,
/// synchronous dispatch.
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use tempo_shared::EventEmitter;

#[test]
fn connected_observer_fires_every_emit() {
    let mut emitter: EventEmitter<u32> = EventEmitter::new();
    let count = Arc::new(AtomicU32::new(0));

    let counter = count.clone();
    emitter.connect(move |value| {
        counter.fetch_add(*value, Ordering::SeqCst);
    });

    emitter.emit(&1);
    emitter.emit(&2);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn once_observer_fires_a_single_time() {
    let mut emitter: EventEmitter<u32> = EventEmitter::new();
    let count = Arc::new(AtomicU32::new(0));

    let counter = count.clone();
    emitter.once(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    emitter.emit(&0);
    emitter.emit(&0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(emitter.is_empty());
}

#[test]
fn disconnect_cancels_the_subscription() {
    let mut emitter: EventEmitter<u32> = EventEmitter::new();
    let count = Arc::new(AtomicU32::new(0));

    let counter = count.clone();
    let key = emitter.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    emitter.emit(&0);
    assert!(emitter.disconnect(&key));
    emitter.emit(&0);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    // Second disconnect is a no-op.
    assert!(!emitter.disconnect(&key));
}

#[test]
fn observers_fire_in_connection_order() {
    let mut emitter: EventEmitter<u32> = EventEmitter::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let order = order.clone();
        emitter.connect(move |_| {
            order.lock().unwrap().push(tag);
        });
    }

    emitter.emit(&0);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}
