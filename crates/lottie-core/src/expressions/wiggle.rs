//! `wiggle(freq, amp, octaves, amp_mult, t)` on Perlin noise.
//!
//! Noise is seeded from the expression source and the owning layer, so the
//! same property wiggles the same way every time it is evaluated.

use noise::{NoiseFn, Perlin};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct WiggleState {
    perlin: Perlin,
    seed: u32,
}

impl WiggleState {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    pub fn from_key(key: impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self::with_seed((hasher.finish() & 0xFFFF_FFFF) as u32)
    }

    /// One dimension of noise in `[-amp, amp]`.
    pub fn wiggle(&self, time: f64, freq: f64, amp: f64, octaves: i32, amp_mult: f64) -> f64 {
        self.sample(self.seed, time, freq, amp, octaves, amp_mult)
    }

    fn sample(&self, lane: u32, time: f64, freq: f64, amp: f64, octaves: i32, amp_mult: f64) -> f64 {
        let amp = amp.abs();
        let mut result = 0.0;
        let mut current_amp = amp;
        let mut current_freq = 1.0;
        for _ in 0..octaves.max(1) {
            // perlin is zero on integer lattice points, keep coordinates fractional
            let n = self.perlin.get([
                time * freq * current_freq * 0.37 + 0.5,
                lane as f64 * 0.013 + 0.25,
            ]);
            result += n * current_amp;
            current_amp *= amp_mult;
            current_freq *= 2.0;
        }
        result.clamp(-amp, amp)
    }

    /// Offsets every component with independent noise.
    pub fn wiggle_components(
        &self,
        base: &[f64],
        time: f64,
        freq: f64,
        amp: f64,
        octaves: i32,
        amp_mult: f64,
    ) -> Vec<f64> {
        base.iter()
            .enumerate()
            .map(|(i, b)| {
                let lane = self.seed.wrapping_add((i as u32).wrapping_mul(7919));
                b + self.sample(lane, time, freq, amp, octaves, amp_mult)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiggle_deterministic() {
        let state = WiggleState::with_seed(12345);
        let v1 = state.wiggle(1.0, 5.0, 10.0, 1, 0.5);
        let v2 = state.wiggle(1.0, 5.0, 10.0, 1, 0.5);
        assert_eq!(v1, v2);

        let other = WiggleState::from_key(("wiggle(2, 30)", 3usize));
        let again = WiggleState::from_key(("wiggle(2, 30)", 3usize));
        assert_eq!(
            other.wiggle(0.4, 2.0, 30.0, 1, 0.5),
            again.wiggle(0.4, 2.0, 30.0, 1, 0.5)
        );
    }

    #[test]
    fn test_wiggle_time_variation() {
        let state = WiggleState::with_seed(12345);
        let samples: Vec<f64> = (0..10)
            .map(|i| state.wiggle(i as f64 * 0.13, 5.0, 10.0, 1, 0.5))
            .collect();
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_wiggle_amplitude_bounds() {
        let state = WiggleState::with_seed(12345);
        let amp = 10.0;
        for i in 0..100 {
            let t = i as f64 / 30.0;
            let v = state.wiggle(t, 5.0, amp, 3, 0.5);
            assert!(
                (-amp..=amp).contains(&v),
                "Wiggle value {} out of bounds [-{}, {}]",
                v,
                amp,
                amp
            );
        }
    }

    #[test]
    fn test_wiggle_components() {
        let state = WiggleState::with_seed(7);
        let v = state.wiggle_components(&[100.0, 200.0], 1.0, 5.0, 10.0, 1, 0.5);
        assert_eq!(v.len(), 2);
        assert!((90.0..=110.0).contains(&v[0]));
        assert!((190.0..=210.0).contains(&v[1]));
    }
}
