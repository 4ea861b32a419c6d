//! Quadrature decoding.
//!
//! Converts A/B channel transitions into a signed count of quarter-cycles
//! per axis. Everything in this module that takes `&self` may be called
//! from the edge context (interrupt handler or source thread) and completes
//! in bounded time: no locks, no allocation, no I/O.
//!
//! # Shared state
//!
//! Each axis owns one [`EncoderCounter`] holding the `(raw_count,
//! zero_offset)` pair packed into a single `AtomicU64`:
//!
//! ```text
//!  63            32 31             0
//! ┌────────────────┬────────────────┐
//! │  zero_offset   │   raw_count    │
//! └────────────────┴────────────────┘
//! ```
//!
//! A snapshot is one atomic load, so the tracker can never observe a count
//! from one instant and an offset from another. Edge handlers and `zero()`
//! update the word with a compare-and-swap loop that only retries if another
//! writer landed between its load and its store.

use arm::arm::source::EdgeSink;
use arm::arm::types::{Channel, ChannelLevels, Direction};
use arm::consts::NUM_AXES;
use static_assertions::const_assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Quadrature phase.
///
/// Positive rotation walks `P0 → P1 → P2 → P3 → P0`, i.e. channel B leads A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// A = 0, B = 0
    P0 = 0,
    /// A = 0, B = 1
    P1 = 1,
    /// A = 1, B = 1
    P2 = 2,
    /// A = 1, B = 0
    P3 = 3,
}

impl Phase {
    /// Phase for the given channel levels.
    #[inline]
    pub const fn from_levels(levels: ChannelLevels) -> Self {
        match (levels.a, levels.b) {
            (false, false) => Self::P0,
            (false, true) => Self::P1,
            (true, true) => Self::P2,
            (true, false) => Self::P3,
        }
    }

    /// Channel levels of this phase.
    #[inline]
    pub const fn levels(self) -> ChannelLevels {
        match self {
            Self::P0 => ChannelLevels::new(false, false),
            Self::P1 => ChannelLevels::new(false, true),
            Self::P2 => ChannelLevels::new(true, true),
            Self::P3 => ChannelLevels::new(true, false),
        }
    }

    /// Next phase in the positive direction.
    #[inline]
    pub const fn forward(self) -> Self {
        Self::from_index(self as u8 + 1)
    }

    /// Next phase in the negative direction.
    #[inline]
    pub const fn backward(self) -> Self {
        Self::from_index(self as u8 + 3)
    }

    #[inline]
    const fn from_index(index: u8) -> Self {
        match index & 0b11 {
            0 => Self::P0,
            1 => Self::P1,
            2 => Self::P2,
            _ => Self::P3,
        }
    }

    /// Quarter-steps from `self` forward to `to`, in `0..4`.
    #[inline]
    const fn steps_to(self, to: Self) -> u8 {
        (to as u8).wrapping_sub(self as u8) & 0b11
    }
}

/// Count change for a transition of `channel`, given both levels read
/// right after it.
///
/// Channel A: `+1` if A == B, else `-1`. Channel B: `+1` if A != B, else
/// `-1`. A bounced or otherwise malformed edge produces a wrong count
/// without any error.
#[inline]
pub const fn edge_delta(channel: Channel, levels: ChannelLevels) -> i32 {
    let same = levels.a == levels.b;
    match channel {
        Channel::A => {
            if same {
                1
            } else {
                -1
            }
        }
        Channel::B => {
            if same {
                -1
            } else {
                1
            }
        }
    }
}

/// Decode a sampled level pair against the previous phase.
///
/// Returns the new phase and the count change: `+1` for one step forward,
/// `-1` for one step back, `0` for no change or for a two-step jump (both
/// channels changed between samples, direction unknown).
#[inline]
pub const fn decode(previous: Phase, levels: ChannelLevels) -> (Phase, i32) {
    let next = Phase::from_levels(levels);
    let delta = match previous.steps_to(next) {
        1 => 1,
        3 => -1,
        _ => 0,
    };
    (next, delta)
}

/// Consistent `(raw_count, zero_offset)` pair read at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountSnapshot {
    /// Decoded count, wraps at the `i32` range
    pub raw_count: i32,
    /// Count treated as angle zero
    pub zero_offset: i32,
}

impl CountSnapshot {
    /// `(raw_count - zero_offset) × direction`, wrapping.
    #[inline]
    pub const fn adjusted(self, direction: Direction) -> i32 {
        self.raw_count
            .wrapping_sub(self.zero_offset)
            .wrapping_mul(direction.sign())
    }
}

#[inline]
const fn pack(raw_count: i32, zero_offset: i32) -> u64 {
    ((zero_offset as u32 as u64) << 32) | (raw_count as u32 as u64)
}

#[inline]
const fn unpack(word: u64) -> CountSnapshot {
    CountSnapshot {
        raw_count: word as u32 as i32,
        zero_offset: (word >> 32) as u32 as i32,
    }
}

/// Per-axis shared count word.
///
/// Written by the decoder (`add`) and by calibration (`zero`); read by the
/// tracker (`snapshot`). One per cache line so axes never contend.
#[derive(Debug)]
#[repr(C, align(64))]
pub struct EncoderCounter {
    packed: AtomicU64,
}

const_assert_eq!(std::mem::size_of::<EncoderCounter>(), 64);
const_assert_eq!(std::mem::align_of::<EncoderCounter>(), 64);

impl EncoderCounter {
    /// Create a counter at raw count 0 with the given zero offset.
    pub const fn new(zero_offset: i32) -> Self {
        Self {
            packed: AtomicU64::new(pack(0, zero_offset)),
        }
    }

    /// Add `delta` to the raw count, leaving the zero offset untouched.
    ///
    /// Returns the new raw count.
    #[inline]
    pub fn add(&self, delta: i32) -> i32 {
        let previous = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let s = unpack(word);
                Some(pack(s.raw_count.wrapping_add(delta), s.zero_offset))
            })
            .unwrap_or_else(|word| word);
        unpack(previous).raw_count.wrapping_add(delta)
    }

    /// Set `zero_offset := raw_count` in one atomic step.
    ///
    /// Returns the new zero offset.
    pub fn zero(&self) -> i32 {
        let previous = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let s = unpack(word);
                Some(pack(s.raw_count, s.raw_count))
            })
            .unwrap_or_else(|word| word);
        unpack(previous).raw_count
    }

    /// Read both fields as of a single instant.
    #[inline]
    pub fn snapshot(&self) -> CountSnapshot {
        unpack(self.packed.load(Ordering::Acquire))
    }

    /// Current raw count.
    #[inline]
    pub fn raw_count(&self) -> i32 {
        self.snapshot().raw_count
    }
}

impl Default for EncoderCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Decoder for one axis.
///
/// Two entry points, both callable from the edge context:
/// - [`on_edge`](Self::on_edge) for edge-triggered handlers (one per channel)
/// - [`on_sample`](Self::on_sample) for polled level sampling
///
/// Both agree on clean quadrature sequences.
#[derive(Debug)]
pub struct QuadratureDecoder {
    counter: Arc<EncoderCounter>,
    phase: AtomicU8,
    missed: AtomicU32,
}

impl QuadratureDecoder {
    /// Create a decoder feeding `counter`, assuming both channels idle low.
    pub fn new(counter: Arc<EncoderCounter>) -> Self {
        Self {
            counter,
            phase: AtomicU8::new(Phase::P0 as u8),
            missed: AtomicU32::new(0),
        }
    }

    /// Handle a transition of `channel`.
    #[inline]
    pub fn on_edge(&self, channel: Channel, levels: ChannelLevels) {
        self.counter.add(edge_delta(channel, levels));
        self.phase
            .store(Phase::from_levels(levels) as u8, Ordering::Relaxed);
    }

    /// Handle a polled sample of both channels.
    ///
    /// A two-step jump is not counted and increments
    /// [`missed_transitions`](Self::missed_transitions).
    #[inline]
    pub fn on_sample(&self, levels: ChannelLevels) {
        let previous = Phase::from_index(self.phase.load(Ordering::Relaxed));
        let (next, delta) = decode(previous, levels);
        if delta != 0 {
            self.counter.add(delta);
        } else if next != previous {
            self.missed.fetch_add(1, Ordering::Relaxed);
        }
        self.phase.store(next as u8, Ordering::Relaxed);
    }

    /// Last decoded phase.
    pub fn phase(&self) -> Phase {
        Phase::from_index(self.phase.load(Ordering::Relaxed))
    }

    /// Number of two-step jumps seen by `on_sample`.
    pub fn missed_transitions(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Current raw count of this axis.
    pub fn raw_count(&self) -> i32 {
        self.counter.raw_count()
    }
}

/// The decoders of all axes, addressed 1..=`NUM_AXES`.
///
/// This is the [`EdgeSink`] handed to edge sources.
#[derive(Debug)]
pub struct DecoderBank {
    decoders: [QuadratureDecoder; NUM_AXES],
}

impl DecoderBank {
    /// Build one decoder per counter.
    pub fn new(counters: &[Arc<EncoderCounter>; NUM_AXES]) -> Self {
        Self {
            decoders: std::array::from_fn(|i| QuadratureDecoder::new(Arc::clone(&counters[i]))),
        }
    }

    /// Decoder of `axis` (1-based).
    #[inline]
    pub fn decoder(&self, axis: usize) -> Option<&QuadratureDecoder> {
        axis.checked_sub(1).and_then(|idx| self.decoders.get(idx))
    }

    /// Two-step jumps seen by polled decoding, per axis.
    pub fn missed_transitions(&self) -> [u32; NUM_AXES] {
        std::array::from_fn(|idx| self.decoders[idx].missed_transitions())
    }
}

impl EdgeSink for DecoderBank {
    #[inline]
    fn on_edge(&self, axis: usize, channel: Channel, levels: ChannelLevels) {
        if let Some(decoder) = self.decoder(axis) {
            decoder.on_edge(channel, levels);
        }
    }

    #[inline]
    fn on_sample(&self, axis: usize, levels: ChannelLevels) {
        if let Some(decoder) = self.decoder(axis) {
            decoder.on_sample(levels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lv(a: u8, b: u8) -> ChannelLevels {
        ChannelLevels::new(a != 0, b != 0)
    }

    /// B↑, A↑, B↓, A↓ starting from (0,0).
    const B_LEADS: [(Channel, u8, u8); 4] = [
        (Channel::B, 0, 1),
        (Channel::A, 1, 1),
        (Channel::B, 1, 0),
        (Channel::A, 0, 0),
    ];

    /// A↑, B↑, A↓, B↓ starting from (0,0).
    const A_LEADS: [(Channel, u8, u8); 4] = [
        (Channel::A, 1, 0),
        (Channel::B, 1, 1),
        (Channel::A, 0, 1),
        (Channel::B, 0, 0),
    ];

    fn decoder() -> QuadratureDecoder {
        QuadratureDecoder::new(Arc::new(EncoderCounter::default()))
    }

    #[test]
    fn b_leading_cycle_counts_plus_four() {
        let d = decoder();
        for (channel, a, b) in B_LEADS {
            d.on_edge(channel, lv(a, b));
        }
        assert_eq!(d.raw_count(), 4);
    }

    #[test]
    fn a_leading_cycle_counts_minus_four() {
        let d = decoder();
        for (channel, a, b) in A_LEADS {
            d.on_edge(channel, lv(a, b));
        }
        assert_eq!(d.raw_count(), -4);
    }

    #[test]
    fn edge_delta_table() {
        assert_eq!(edge_delta(Channel::A, lv(0, 0)), 1);
        assert_eq!(edge_delta(Channel::A, lv(1, 1)), 1);
        assert_eq!(edge_delta(Channel::A, lv(1, 0)), -1);
        assert_eq!(edge_delta(Channel::A, lv(0, 1)), -1);
        assert_eq!(edge_delta(Channel::B, lv(0, 1)), 1);
        assert_eq!(edge_delta(Channel::B, lv(1, 0)), 1);
        assert_eq!(edge_delta(Channel::B, lv(0, 0)), -1);
        assert_eq!(edge_delta(Channel::B, lv(1, 1)), -1);
    }

    #[test]
    fn decode_table() {
        assert_eq!(decode(Phase::P0, lv(0, 1)), (Phase::P1, 1));
        assert_eq!(decode(Phase::P0, lv(1, 0)), (Phase::P3, -1));
        assert_eq!(decode(Phase::P3, lv(0, 0)), (Phase::P0, 1));
        assert_eq!(decode(Phase::P2, lv(1, 1)), (Phase::P2, 0));
        assert_eq!(decode(Phase::P0, lv(1, 1)), (Phase::P2, 0));
    }

    #[test]
    fn phase_walk_wraps() {
        assert_eq!(Phase::P3.forward(), Phase::P0);
        assert_eq!(Phase::P0.backward(), Phase::P3);
        for phase in [Phase::P0, Phase::P1, Phase::P2, Phase::P3] {
            assert_eq!(Phase::from_levels(phase.levels()), phase);
            assert_eq!(phase.forward().backward(), phase);
        }
    }

    #[test]
    fn skipped_sample_is_reported_not_counted() {
        let d = decoder();
        d.on_sample(lv(1, 1));
        assert_eq!(d.raw_count(), 0);
        assert_eq!(d.missed_transitions(), 1);
        assert_eq!(d.phase(), Phase::P2);

        d.on_sample(lv(1, 0));
        assert_eq!(d.raw_count(), 1);
    }

    #[test]
    fn repeated_sample_is_idle() {
        let d = decoder();
        d.on_sample(lv(0, 1));
        d.on_sample(lv(0, 1));
        d.on_sample(lv(0, 1));
        assert_eq!(d.raw_count(), 1);
        assert_eq!(d.missed_transitions(), 0);
    }

    #[test]
    fn counter_wraps_at_i32_range() {
        let counter = EncoderCounter::new(0);
        assert_eq!(counter.add(i32::MAX), i32::MAX);
        assert_eq!(counter.add(1), i32::MIN);
        assert_eq!(counter.raw_count(), i32::MIN);
        assert_eq!(counter.snapshot().zero_offset, 0);
    }

    #[test]
    fn negative_count_does_not_touch_offset() {
        let counter = EncoderCounter::new(-17);
        counter.add(-5);
        let s = counter.snapshot();
        assert_eq!(s.raw_count, -5);
        assert_eq!(s.zero_offset, -17);
        assert_eq!(s.adjusted(Direction::Normal), 12);
        assert_eq!(s.adjusted(Direction::Reversed), -12);
    }

    #[test]
    fn zero_copies_raw_into_offset() {
        let counter = EncoderCounter::new(3);
        counter.add(250);
        assert_eq!(counter.zero(), 250);
        let s = counter.snapshot();
        assert_eq!(s, CountSnapshot { raw_count: 250, zero_offset: 250 });
        assert_eq!(s.adjusted(Direction::Normal), 0);
    }

    #[test]
    fn bank_ignores_out_of_range_axis() {
        let counters: [Arc<EncoderCounter>; NUM_AXES] =
            std::array::from_fn(|_| Arc::new(EncoderCounter::default()));
        let bank = DecoderBank::new(&counters);

        bank.on_edge(0, Channel::B, lv(0, 1));
        bank.on_edge(5, Channel::B, lv(0, 1));
        bank.on_edge(3, Channel::B, lv(0, 1));
        bank.on_sample(9, lv(1, 1));
        bank.on_sample(4, lv(1, 1));

        assert!(bank.decoder(0).is_none());
        assert_eq!(bank.missed_transitions(), [0, 0, 0, 1]);
        assert_eq!(counters[0].raw_count(), 0);
        assert_eq!(counters[2].raw_count(), 1);
        assert_eq!(counters[3].raw_count(), 0);
    }

    proptest! {
        #[test]
        fn clean_walk_counts_net_steps(steps in proptest::collection::vec(any::<bool>(), 0..400)) {
            let edge = decoder();
            let polled = decoder();
            let mut phase = Phase::P0;
            let mut net = 0i32;

            for forward in steps {
                let next = if forward { phase.forward() } else { phase.backward() };
                let (from, to) = (phase.levels(), next.levels());
                let channel = if from.a != to.a { Channel::A } else { Channel::B };

                edge.on_edge(channel, to);
                polled.on_sample(to);

                net += if forward { 1 } else { -1 };
                phase = next;
            }

            prop_assert_eq!(edge.raw_count(), net);
            prop_assert_eq!(polled.raw_count(), net);
            prop_assert_eq!(polled.missed_transitions(), 0);
        }

        #[test]
        fn adjusted_is_zero_after_zeroing(start in any::<i32>(), moves in -10_000i32..10_000) {
            let counter = EncoderCounter::new(start);
            counter.add(moves);
            counter.zero();
            prop_assert_eq!(counter.snapshot().adjusted(Direction::Normal), 0);
            prop_assert_eq!(counter.raw_count(), moves);
        }
    }
}
