//! # Rendezvous Core Verification Tests
//!
//! These tests verify the concurrency contracts of the monitor:
//!
//! 1. **No double delivery**: every token reaches exactly one getter
//! 2. **Barrier atomicity**: get_from_all drains all-or-nothing
//! 3. **Cancellation**: a stopped session unwinds every parked thread
//!
//! Run with: cargo test --package conclave_core --test rendezvous_verification

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use conclave_core::{Director, RendezvousError, Worker};

// ============================================================================
// CONTRACT 1: NO DOUBLE DELIVERY
// ============================================================================

#[test]
fn verify_each_token_is_delivered_to_exactly_one_getter() {
    const TOKENS: u32 = 200;
    const GETTERS: usize = 4;

    let director: Arc<Director<u32>> = Director::new();
    let rx = director.channel("contended");
    let (sink, drained) = crossbeam_channel::unbounded();

    // Several consumers race on one receiver.
    let mut getters = Vec::new();
    for i in 0..GETTERS {
        let rx = rx.clone();
        let sink = sink.clone();
        getters.push(Worker::spawn(&director, format!("getter[{i}]"), move || {
            loop {
                let token = rx.get()?;
                sink.send(token).expect("collector alive");
            }
        }));
    }
    drop(sink);

    let tx = rx.clone();
    for token in 0..TOKENS {
        tx.put(token).unwrap();
    }

    let mut seen = HashSet::new();
    for _ in 0..TOKENS {
        let token = drained
            .recv_timeout(Duration::from_secs(5))
            .expect("every token must be delivered");
        assert!(seen.insert(token), "token {token} delivered twice");
    }

    // Nothing extra may arrive: the slot is empty and producers stopped.
    assert!(drained.recv_timeout(Duration::from_millis(100)).is_err());

    director.request_stop();
    for getter in &mut getters {
        getter.join();
    }
    assert_eq!(director.worker_count(), 0);
}

// ============================================================================
// CONTRACT 2: BARRIER ATOMICITY
// ============================================================================

#[test]
fn verify_get_from_all_never_exposes_partial_drains() {
    const ROUNDS: u32 = 100;
    const WIDTH: usize = 3;

    let director: Arc<Director<u32>> = Director::new();
    let inputs: Vec<_> = (0..WIDTH)
        .map(|i| director.channel(format!("lane[{i}]")))
        .collect();

    // One producer per lane, each sending a strictly increasing sequence.
    let mut producers = Vec::new();
    for input in &inputs {
        let tx = input.clone();
        producers.push(Worker::spawn(&director, "producer", move || {
            for round in 0..ROUNDS {
                tx.put(round)?;
            }
            Ok(())
        }));
    }

    // Every completed barrier must have drained the same round from all
    // lanes: producers cannot advance to round N+1 on any lane until the
    // barrier consumed round N on every lane.
    for round in 0..ROUNDS {
        let tokens = director.get_from_all(&inputs).unwrap();
        assert_eq!(tokens, vec![round; WIDTH], "partial drain observed");
    }

    for producer in &mut producers {
        producer.join();
    }
}

// ============================================================================
// CONTRACT 3: COOPERATIVE CANCELLATION
// ============================================================================

#[test]
fn verify_stop_unwinds_every_parked_primitive() {
    let director: Arc<Director<u32>> = Director::new();
    let empty = director.channel("never-fed");
    let full = director.channel("never-drained");
    full.put(1).unwrap();

    let getter_rx = empty.clone();
    let putter_rx = full.clone();
    let d_all = Arc::clone(&director);
    let all_rx = vec![empty.clone(), full.clone()];

    let getter = thread::spawn(move || getter_rx.get());
    let putter = thread::spawn(move || putter_rx.put(2));
    let barrier = thread::spawn(move || d_all.get_from_all(&all_rx));

    // Let all three park, then pull the plug.
    thread::sleep(Duration::from_millis(100));
    director.request_stop();

    assert_eq!(getter.join().unwrap().unwrap_err(), RendezvousError::Cancelled);
    assert_eq!(putter.join().unwrap().unwrap_err(), RendezvousError::Cancelled);
    assert_eq!(barrier.join().unwrap().unwrap_err(), RendezvousError::Cancelled);

    // The pending exchange was not completed: the full slot kept its token.
    assert!(full.is_full());
}

// ============================================================================
// CONTRACT 4: QUIESCENCE TRACKING UNDER REAL BLOCKING
// ============================================================================

#[test]
fn verify_quiescence_is_reported_when_all_workers_park() {
    let director: Arc<Director<u32>> = Director::new();
    let a = director.channel("a");
    let b = director.channel("b");

    let rx_a = a.clone();
    let mut w1 = Worker::spawn(&director, "reader-a", move || {
        let _ = rx_a.get()?;
        Ok(())
    });
    let rx_b = b.clone();
    let mut w2 = Worker::spawn(&director, "reader-b", move || {
        let _ = rx_b.get()?;
        Ok(())
    });

    // Judge quiescence only once both workers have registered; with one
    // registered and parked the session is already (trivially) quiescent.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while director.worker_count() < 2 {
        assert!(std::time::Instant::now() < deadline, "workers never registered");
        thread::sleep(Duration::from_millis(5));
    }

    // Both workers can only block; the session must report quiescence.
    while !director.is_quiescent() {
        assert!(std::time::Instant::now() < deadline, "quiescence never reported");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(director.blocked_count(), 2);

    // External input dissolves the quiescent state.
    a.put(1).unwrap();
    b.put(2).unwrap();
    w1.join();
    w2.join();
    assert_eq!(director.worker_count(), 0);
}
