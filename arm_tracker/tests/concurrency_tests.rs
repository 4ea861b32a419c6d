//! Edge delivery from a second thread racing `zero()` and `update()`.

use arm::arm::config::EncoderConfig;
use arm::arm::source::EdgeSink;
use arm::arm::types::Channel;
use arm::consts::NUM_AXES;
use arm_tracker::AngleTracker;
use arm_tracker::encoder::{DecoderBank, Phase};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// One clean quadrature step on `axis`, returning the new phase.
fn step(bank: &DecoderBank, axis: usize, phase: Phase, forward: bool) -> Phase {
    let next = if forward { phase.forward() } else { phase.backward() };
    let channel = if phase.levels().a != next.levels().a {
        Channel::A
    } else {
        Channel::B
    };
    bank.on_edge(axis, channel, next.levels());
    next
}

#[test]
fn zero_never_loses_edges() {
    let mut tracker = AngleTracker::new(&EncoderConfig::default());
    let bank = tracker.decoders();
    let stop = Arc::new(AtomicBool::new(false));

    let edge_thread = {
        let bank = Arc::clone(&bank);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut phases = [Phase::P0; NUM_AXES];
            let mut net = [0i64; NUM_AXES];
            let mut i: u64 = 0;
            while !stop.load(Ordering::Relaxed) || i < 200_000 {
                for axis in 1..=NUM_AXES {
                    // axis 1 only forward, others wander
                    let forward = axis == 1 || (i / (axis as u64 * 7)) % 3 != 0;
                    phases[axis - 1] = step(&bank, axis, phases[axis - 1], forward);
                    net[axis - 1] += if forward { 1 } else { -1 };
                }
                i += 1;
            }
            net
        })
    };

    for _ in 0..5_000 {
        tracker.zero();
        tracker.update();
        let snapshot = tracker.joint(1).unwrap().snapshot();
        // axis 1 only counts up, so a consistent pair never has zero > raw
        assert!(snapshot.zero_offset <= snapshot.raw_count);
    }
    stop.store(true, Ordering::Relaxed);
    let net = edge_thread.join().unwrap();

    tracker.zero();
    tracker.update();
    for axis in 1..=NUM_AXES {
        assert_eq!(i64::from(tracker.raw_count(axis)), net[axis - 1]);
        assert_eq!(tracker.angle_radians(axis), 0.0);
        assert_eq!(tracker.angle_degrees(axis), 0.0);
    }
}

#[test]
fn concurrent_updates_see_monotonic_angle() {
    let mut tracker = AngleTracker::new(&EncoderConfig::default());
    let bank = tracker.decoders();
    let stop = Arc::new(AtomicBool::new(false));

    let edge_thread = {
        let bank = Arc::clone(&bank);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut phase = Phase::P0;
            let mut steps = 0u32;
            while !stop.load(Ordering::Relaxed) && steps < 1_000_000 {
                phase = step(&bank, 2, phase, true);
                steps += 1;
            }
            steps
        })
    };

    let mut last = 0.0;
    for _ in 0..2_000 {
        tracker.update();
        let angle = tracker.angle_radians(2);
        assert!(angle >= last);
        last = angle;
    }
    stop.store(true, Ordering::Relaxed);
    let steps = edge_thread.join().unwrap();

    tracker.update();
    assert_eq!(tracker.raw_count(2), steps as i32);
}
