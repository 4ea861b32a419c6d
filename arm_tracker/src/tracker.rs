//! Angle tracker.
//!
//! Samples the per-axis counters on the polling side and turns them into
//! calibrated joint angles. Axes are addressed 1..=4; any other index reads
//! as 0.

use crate::encoder::{CountSnapshot, DecoderBank, EncoderCounter};
use arm::arm::config::EncoderConfig;
use arm::arm::types::{Direction, JointAngles};
use arm::consts::NUM_AXES;
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, info};

/// Calibration and counter of one joint.
#[derive(Debug)]
pub struct JointEncoderState {
    counter: Arc<EncoderCounter>,
    direction: Direction,
    counts_per_revolution: u32,
}

impl JointEncoderState {
    fn new(zero_offset: i32, direction: Direction, counts_per_revolution: u32) -> Self {
        Self {
            counter: Arc::new(EncoderCounter::new(zero_offset)),
            direction,
            counts_per_revolution: counts_per_revolution.max(1),
        }
    }

    /// Consistent `(raw_count, zero_offset)` pair.
    pub fn snapshot(&self) -> CountSnapshot {
        self.counter.snapshot()
    }

    /// Counting direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Counts per full revolution, always > 0.
    pub fn counts_per_revolution(&self) -> u32 {
        self.counts_per_revolution
    }

    /// Angle in radians for a snapshot of this joint.
    #[inline]
    fn radians(&self, snapshot: CountSnapshot) -> f64 {
        let adjusted = snapshot.adjusted(self.direction);
        adjusted as f64 / (self.counts_per_revolution as f64 / TAU)
    }
}

/// Angle of one joint as of the last `update()`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleSample {
    /// Angle in radians
    pub radians: f64,
    /// Angle in degrees
    pub degrees: f64,
}

impl AngleSample {
    fn from_radians(radians: f64) -> Self {
        Self {
            radians,
            degrees: radians.to_degrees(),
        }
    }
}

/// Turns decoder counts into calibrated joint angles.
///
/// The tracker owns the counters; the decoders that feed them are reached
/// through [`decoders`](Self::decoders) and handed to the edge context.
#[derive(Debug)]
pub struct AngleTracker {
    joints: [JointEncoderState; NUM_AXES],
    samples: [AngleSample; NUM_AXES],
    decoders: Arc<DecoderBank>,
    ppr: u32,
    multiplier: u32,
}

impl AngleTracker {
    /// Create the tracker with every raw count at 0.
    ///
    /// Direction and zero offset come from `config.axes[i]`; missing entries
    /// default to `Normal` and 0. The configuration is not validated here.
    pub fn new(config: &EncoderConfig) -> Self {
        let multiplier = config.multiplier;
        let cpr = config.counts_per_revolution();

        let joints: [JointEncoderState; NUM_AXES] = std::array::from_fn(|idx| {
            let (zero_offset, direction) = config
                .axes
                .get(idx)
                .map(|axis| (axis.zero_offset, axis.direction))
                .unwrap_or((0, Direction::Normal));
            JointEncoderState::new(zero_offset, direction, cpr)
        });

        let counters: [Arc<EncoderCounter>; NUM_AXES] =
            std::array::from_fn(|idx| Arc::clone(&joints[idx].counter));
        let decoders = Arc::new(DecoderBank::new(&counters));

        info!(
            "AngleTracker created: ppr={}, multiplier={}, counts/rev={}",
            config.ppr,
            multiplier,
            cpr.max(1)
        );

        let mut tracker = Self {
            joints,
            samples: [AngleSample::default(); NUM_AXES],
            decoders,
            ppr: config.ppr,
            multiplier,
        };
        tracker.update();
        tracker
    }

    /// Decoder bank feeding this tracker's counters.
    pub fn decoders(&self) -> Arc<DecoderBank> {
        Arc::clone(&self.decoders)
    }

    /// Two-step jumps dropped by polled decoding, per axis.
    pub fn missed_transitions(&self) -> [u32; NUM_AXES] {
        self.decoders.missed_transitions()
    }

    /// Recompute every angle from one atomic snapshot per axis.
    ///
    /// Axes are sampled one after another; no cross-axis consistency.
    pub fn update(&mut self) {
        for (joint, sample) in self.joints.iter().zip(self.samples.iter_mut()) {
            *sample = AngleSample::from_radians(joint.radians(joint.snapshot()));
        }
    }

    /// Make the current position the zero of every axis.
    ///
    /// Angles read 0 after the next [`update`](Self::update).
    pub fn zero(&mut self) {
        for (idx, joint) in self.joints.iter().enumerate() {
            let offset = joint.counter.zero();
            debug!("Axis {} zeroed at raw count {}", idx + 1, offset);
        }
    }

    /// Change the encoder resolution.
    ///
    /// Only the divisor changes; raw counts and zero offsets are kept.
    pub fn set_resolution(&mut self, ppr: u32) {
        let cpr = ppr.saturating_mul(self.multiplier).max(1);
        for joint in &mut self.joints {
            joint.counts_per_revolution = cpr;
        }
        self.ppr = ppr;
        debug!("Resolution set: ppr={}, counts/rev={}", ppr, cpr);
    }

    /// Current pulses per revolution.
    pub fn resolution(&self) -> u32 {
        self.ppr
    }

    /// Joint state of `axis` (1..=4).
    pub fn joint(&self, axis: usize) -> Option<&JointEncoderState> {
        axis.checked_sub(1).and_then(|idx| self.joints.get(idx))
    }

    fn sample(&self, axis: usize) -> AngleSample {
        axis.checked_sub(1)
            .and_then(|idx| self.samples.get(idx))
            .copied()
            .unwrap_or_default()
    }

    /// Angle of `axis` in radians as of the last update.
    pub fn angle_radians(&self, axis: usize) -> f64 {
        self.sample(axis).radians
    }

    /// Angle of `axis` in degrees as of the last update.
    pub fn angle_degrees(&self, axis: usize) -> f64 {
        self.sample(axis).degrees
    }

    /// Live raw count of `axis`.
    pub fn raw_count(&self, axis: usize) -> i32 {
        self.joint(axis)
            .map(|joint| joint.snapshot().raw_count)
            .unwrap_or(0)
    }

    /// Live zero offset of `axis`.
    pub fn zero_offset(&self, axis: usize) -> i32 {
        self.joint(axis)
            .map(|joint| joint.snapshot().zero_offset)
            .unwrap_or(0)
    }

    /// All four angles in radians as of the last update.
    pub fn angles(&self) -> JointAngles {
        JointAngles(self.samples.map(|s| s.radians))
    }

    /// All four angles in degrees as of the last update.
    pub fn angles_degrees(&self) -> [f64; NUM_AXES] {
        self.samples.map(|s| s.degrees)
    }
}
