// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external dependencies,
// chosen to guarantee identical output across all platforms.
//
// This crate is the single source of randomness for the Deepvault engine:
// every weighted catalog roll, queue draw, and placement coin flip in
// `deepvault_structure` comes from a `WorldgenRng` threaded explicitly
// through the call stack. By avoiding external RNG crates we guarantee that
// a (seed, chunk) pair reproduces the same structure bit-for-bit forever.
//
// **Critical constraint: determinism.** Every method on `WorldgenRng` must
// produce identical output given the same prior state, regardless of
// platform, compiler version, or optimization level. The call ORDER is part
// of the contract: inserting or removing a single draw reshuffles every
// structure generated after it. Do not add hidden draws.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the engine's sole source of randomness.
///
/// One instance is created per structure attempt, seeded from the world
/// seed and the originating chunk. Child streams for position-dependent
/// decisions are split off with [`WorldgenRng::fork_at`] so that a piece's
/// local randomness does not depend on how many draws its neighbors made.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldgenRng {
    s: [u64; 4],
}

impl WorldgenRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two instances created with the same seed produce identical output
    /// sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a `u32` by taking the upper 32 bits of a `u64`.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform `f32` in [0, 1).
    ///
    /// Uses the upper 24 bits of a `u64` to fill the mantissa of an f32.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform integer in `[0, bound)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `bound == 0`.
    pub fn next_bounded(&mut self, bound: u32) -> u32 {
        assert!(bound > 0, "next_bounded: bound must be positive");
        let range = bound as u64;
        if range.is_power_of_two() {
            return (self.next_u64() & (range - 1)) as u32;
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return (r % range) as u32;
            }
        }
    }

    /// Generate a uniform `usize` index in `[0, len)`.
    ///
    /// Convenience for drawing list indices. Panics if `len == 0` or does
    /// not fit in a `u32` (structure piece lists are always small).
    pub fn next_index(&mut self, len: usize) -> usize {
        self.next_bounded(u32::try_from(len).expect("next_index: len too large")) as usize
    }

    /// Return `true` with probability `p`, `false` otherwise.
    ///
    /// `p` outside [0.0, 1.0] is effectively clamped: `p <= 0.0` always
    /// returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Split off a child stream derived from a block position.
    ///
    /// Consumes exactly one draw from `self`, mixes it with a hash of the
    /// position, and seeds a fresh generator through SplitMix64. Two forks
    /// taken at the same point in the parent sequence for the same position
    /// are identical; forks at different positions are independent.
    pub fn fork_at(&mut self, x: i32, y: i32, z: i32) -> Self {
        let base = self.next_u64();
        Self::new(base ^ position_hash(x, y, z))
    }
}

/// Stable 64-bit hash of a block position, used to decorrelate forked
/// streams. The multipliers are arbitrary odd constants; only stability
/// across builds matters.
fn position_hash(x: i32, y: i32, z: i32) -> u64 {
    let mut h = (x as u64)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        .wrapping_add((y as u64).wrapping_mul(0x6a09_e667_f3bc_c909))
        .wrapping_add((z as u64).wrapping_mul(0xbb67_ae85_84ca_a73b));
    h = (h ^ (h >> 29)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^ (h >> 32)
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = WorldgenRng::new(42);
        let mut b = WorldgenRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = WorldgenRng::new(42);
        let mut b = WorldgenRng::new(43);
        // Extremely unlikely to collide on the first value.
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f32_in_unit_range() {
        let mut rng = WorldgenRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "f32 out of range: {v}");
        }
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = WorldgenRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn next_bounded_within_bounds() {
        let mut rng = WorldgenRng::new(999);
        for _ in 0..10_000 {
            let v = rng.next_bounded(7);
            assert!(v < 7, "next_bounded out of range: {v}");
        }
    }

    #[test]
    fn next_bounded_reaches_all_values() {
        let mut rng = WorldgenRng::new(1);
        let mut seen = [false; 5];
        for _ in 0..10_000 {
            seen[rng.next_bounded(5) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "next_bounded(5) missed a value");
    }

    #[test]
    fn next_index_within_bounds() {
        let mut rng = WorldgenRng::new(555);
        for _ in 0..10_000 {
            let v = rng.next_index(12);
            assert!(v < 12, "next_index out of range: {v}");
        }
    }

    #[test]
    fn random_bool_distribution() {
        let mut rng = WorldgenRng::new(42);
        let mut true_count = 0;
        let n = 10_000;
        for _ in 0..n {
            if rng.random_bool(0.5) {
                true_count += 1;
            }
        }
        // Should be roughly 50% ± 5%
        let pct = true_count as f64 / n as f64;
        assert!(
            (0.45..0.55).contains(&pct),
            "random_bool(0.5) should be ~50%, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = WorldgenRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
        }
        for _ in 0..100 {
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn fork_at_is_deterministic() {
        let mut a = WorldgenRng::new(7);
        let mut b = WorldgenRng::new(7);
        let mut fa = a.fork_at(10, 64, -3);
        let mut fb = b.fork_at(10, 64, -3);
        for _ in 0..100 {
            assert_eq!(fa.next_u64(), fb.next_u64());
        }
        // Parent streams stay in lockstep after forking.
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn fork_at_decorrelates_positions() {
        let mut rng = WorldgenRng::new(7);
        let mut fa = rng.clone().fork_at(0, 0, 0);
        let mut fb = rng.fork_at(1, 0, 0);
        assert_ne!(fa.next_u64(), fb.next_u64());
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = WorldgenRng::new(42);
        // Advance state
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: WorldgenRng = serde_json::from_str(&json).unwrap();
        // Continued sequences should match.
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }

    #[test]
    fn known_sequence_is_stable() {
        let mut rng = WorldgenRng::new(0);
        // Snapshot-style check: the sequence from a fixed seed must never
        // change across compiles. If this test breaks, determinism has
        // been violated.
        let vals: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        let mut rng2 = WorldgenRng::new(0);
        let vals2: Vec<u64> = (0..5).map(|_| rng2.next_u64()).collect();
        assert_eq!(vals, vals2);
    }
}
