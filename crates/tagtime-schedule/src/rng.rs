// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic ping schedule generator.
//!
//! A multiplicative linear-congruential generator ("ran0": multiplier 16807,
//! modulus 2^31-1) drives exponentially distributed gaps between pings. The
//! whole schedule follows from [`EPOCH`], [`INITIAL_SEED`] and the mean gap,
//! so any past ping time can be rebuilt without stored history.
//!
//! Everything here is a pure function of its arguments.

use tagtime_core::ScheduleState;

/// LCG multiplier.
pub const MULTIPLIER: i64 = 16807;
/// LCG modulus, 2^31-1.
pub const MODULUS: i64 = 2_147_483_647;
/// Seed in effect at [`EPOCH`].
pub const INITIAL_SEED: i64 = 11_193_462;
/// Time of the first ping of every schedule (2007-07-10T19:56:33Z).
pub const EPOCH: i64 = 1_184_097_393;

/// Steps the generator. Returns the new seed and a uniform draw in (0, 1).
pub fn advance(seed: i64) -> (i64, f64) {
    let next = (seed * MULTIPLIER) % MODULUS;
    (next, next as f64 / MODULUS as f64)
}

/// Draws an exponential inter-arrival time with mean `gap_minutes` minutes.
pub fn exponential_gap(seed: i64, gap_minutes: u32) -> (i64, f64) {
    let (next, u) = advance(seed);
    (next, -f64::from(gap_minutes) * 60.0 * u.ln())
}

/// The ping after `prev`. Always at least one second later, so the
/// sequence is strictly increasing even for draws near zero.
pub fn next_timestamp(prev: i64, seed: i64, gap_minutes: u32) -> (i64, i64) {
    let (next_seed, delta) = exponential_gap(seed, gap_minutes);
    // Half-up rounding of the fractional arrival time.
    let rounded = (prev as f64 + delta + 0.5).floor() as i64;
    (next_seed, rounded.max(prev + 1))
}

/// Rebuilds the schedule from [`EPOCH`] and returns the last ping strictly
/// before `target` together with the seed in effect at that ping.
///
/// Feeding the result to [`next_timestamp`] yields the first ping at or
/// after `target`. Targets at or before the epoch return
/// `(INITIAL_SEED, EPOCH)`. Cost is linear in the number of elapsed pings.
pub fn timestamp_before(target: i64, gap_minutes: u32) -> (i64, i64) {
    let mut seed = INITIAL_SEED;
    let mut last = EPOCH;
    let (mut next_seed, mut next) = next_timestamp(EPOCH, INITIAL_SEED, gap_minutes);
    while next < target {
        seed = next_seed;
        last = next;
        (next_seed, next) = next_timestamp(next, next_seed, gap_minutes);
    }
    (seed, last)
}

/// A fresh schedule state whose `next_timestamp` is the first ping at or
/// after `now`.
pub fn reconstruct(now: i64, gap_minutes: u32) -> ScheduleState {
    let (seed, last) = timestamp_before(now, gap_minutes);
    let (seed, next_timestamp) = next_timestamp(last, seed, gap_minutes);
    ScheduleState {
        seed,
        next_timestamp,
        gap_minutes,
    }
}

/// Advances a state by one ping.
pub fn step(state: &ScheduleState) -> ScheduleState {
    let (seed, next_timestamp) =
        next_timestamp(state.next_timestamp, state.seed, state.gap_minutes);
    ScheduleState {
        seed,
        next_timestamp,
        gap_minutes: state.gap_minutes,
    }
}

/// False for states no run of the generator can produce.
pub fn is_valid(state: &ScheduleState) -> bool {
    (1..MODULUS).contains(&state.seed) && state.gap_minutes > 0 && state.next_timestamp >= EPOCH
}

/// Iterator over the pings following a state, without mutating it.
#[derive(Debug, Clone)]
pub struct Upcoming {
    state: ScheduleState,
}

impl Iterator for Upcoming {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.state.next_timestamp;
        self.state = step(&self.state);
        Some(current)
    }
}

/// Pings from `state.next_timestamp` onward.
pub fn upcoming(state: &ScheduleState) -> Upcoming {
    Upcoming { state: *state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_ping_after_epoch_is_reproducible() {
        let (seed, ts) = next_timestamp(EPOCH, INITIAL_SEED, 45);
        assert_eq!(seed, 1_297_438_545);
        assert_eq!(ts, 1_184_098_754);
    }

    #[test]
    fn reference_sequence_from_epoch() {
        let state = ScheduleState {
            seed: INITIAL_SEED,
            next_timestamp: EPOCH,
            gap_minutes: 45,
        };
        let pings: Vec<i64> = upcoming(&state).skip(1).take(6).collect();
        assert_eq!(
            pings,
            vec![
                1_184_098_754,
                1_184_102_685,
                1_184_104_776,
                1_184_105_302,
                1_184_105_815,
                1_184_108_794,
            ]
        );
    }

    #[test]
    fn advance_stays_in_open_unit_interval() {
        let mut seed = INITIAL_SEED;
        for _ in 0..10_000 {
            let (next, u) = advance(seed);
            assert!(u > 0.0 && u < 1.0);
            assert!((1..MODULUS).contains(&next));
            seed = next;
        }
    }

    #[test]
    fn target_before_epoch_clamps_to_epoch() {
        assert_eq!(timestamp_before(0, 45), (INITIAL_SEED, EPOCH));
        assert_eq!(timestamp_before(EPOCH, 45), (INITIAL_SEED, EPOCH));
    }

    #[test]
    fn reconstruct_lands_at_or_after_now() {
        let now = EPOCH + 30 * 86_400;
        let state = reconstruct(now, 45);
        assert!(state.next_timestamp >= now);
        let (_, before) = timestamp_before(now, 45);
        assert!(before < now);
        assert!(is_valid(&state));
    }

    #[test]
    fn invalid_states_are_detected() {
        let good = ScheduleState {
            seed: 5,
            next_timestamp: EPOCH + 10,
            gap_minutes: 45,
        };
        assert!(is_valid(&good));
        assert!(!is_valid(&ScheduleState { seed: 0, ..good }));
        assert!(!is_valid(&ScheduleState {
            seed: MODULUS,
            ..good
        }));
        assert!(!is_valid(&ScheduleState {
            gap_minutes: 0,
            ..good
        }));
        assert!(!is_valid(&ScheduleState {
            next_timestamp: EPOCH - 1,
            ..good
        }));
    }

    /// Linear replay from the epoch: the first ping at or after `target`.
    fn replay_first_at_or_after(target: i64, gap: u32) -> i64 {
        let mut seed = INITIAL_SEED;
        let mut ts = EPOCH;
        loop {
            (seed, ts) = next_timestamp(ts, seed, gap);
            if ts >= target {
                return ts;
            }
        }
    }

    proptest! {
        #[test]
        fn sequence_is_deterministic(seed in 1i64..MODULUS, gap in 1u32..240) {
            let state = ScheduleState { seed, next_timestamp: EPOCH, gap_minutes: gap };
            let a: Vec<i64> = upcoming(&state).take(50).collect();
            let b: Vec<i64> = upcoming(&state).take(50).collect();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn sequence_is_strictly_increasing(seed in 1i64..MODULUS, gap in 1u32..240) {
            let state = ScheduleState { seed, next_timestamp: EPOCH, gap_minutes: gap };
            let pings: Vec<i64> = upcoming(&state).take(200).collect();
            for pair in pings.windows(2) {
                prop_assert!(pair[1] > pair[0]);
            }
        }

        #[test]
        fn fast_and_linear_reconstruction_agree(offset in 1i64..(20 * 86_400), gap in 5u32..120) {
            let target = EPOCH + offset;
            let (seed, before) = timestamp_before(target, gap);
            prop_assert!(before < target);
            let (_, next) = next_timestamp(before, seed, gap);
            prop_assert_eq!(next, replay_first_at_or_after(target, gap));
        }
    }
}
