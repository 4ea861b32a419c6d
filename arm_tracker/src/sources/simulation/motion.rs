//! Per-axis synthetic motion.
//!
//! Each axis follows `amplitude · sin(2π·f·t + shift)` in counts. Every tick
//! the axis walks toward its target one quadrature phase at a time. In edge
//! mode the sink sees every single-channel transition; in polled mode it
//! sees one level sample per tick.

use crate::encoder::Phase;
use arm::arm::source::EdgeSink;
use arm::arm::types::Channel;
use std::f64::consts::TAU;

/// Quadrature signal generator for one axis.
#[derive(Debug, Clone)]
pub struct AxisMotion {
    axis: usize,
    phase: Phase,
    position: i64,
    amplitude: f64,
    shift: f64,
}

impl AxisMotion {
    /// Axis `axis` (1-based) at rest in phase `P0`.
    pub fn new(axis: usize, amplitude_counts: u32, shift: f64) -> Self {
        Self {
            axis,
            phase: Phase::P0,
            position: 0,
            amplitude: f64::from(amplitude_counts),
            shift,
        }
    }

    /// Target count at `t` seconds.
    pub fn target(&self, t: f64, frequency_hz: f64) -> i64 {
        (self.amplitude * (TAU * frequency_hz * t + self.shift).sin()).round() as i64
    }

    /// Signed count emitted so far.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Move one phase toward `target`. Returns the channel that toggled.
    fn advance(&mut self, target: i64) -> Channel {
        let forward = target > self.position;
        let next = if forward {
            self.phase.forward()
        } else {
            self.phase.backward()
        };
        let channel = if self.phase.levels().a != next.levels().a {
            Channel::A
        } else {
            Channel::B
        };
        self.phase = next;
        self.position += if forward { 1 } else { -1 };
        channel
    }

    /// Emit at most `max_steps` edges toward `target`. Returns edges emitted.
    pub fn step_toward(&mut self, target: i64, max_steps: u32, sink: &dyn EdgeSink) -> u32 {
        let mut emitted = 0;
        while self.position != target && emitted < max_steps {
            let channel = self.advance(target);
            sink.on_edge(self.axis, channel, self.phase.levels());
            emitted += 1;
        }
        emitted
    }

    /// Move at most `max_steps` phases toward `target`, then deliver one
    /// sample of the resulting levels. Returns phases moved.
    ///
    /// With `max_steps > 1` the sampler can fall behind the signal, which
    /// the sink sees as skipped phases.
    pub fn sample_toward(&mut self, target: i64, max_steps: u32, sink: &dyn EdgeSink) -> u32 {
        let mut moved = 0;
        while self.position != target && moved < max_steps {
            self.advance(target);
            moved += 1;
        }
        sink.on_sample(self.axis, self.phase.levels());
        moved
    }
}
