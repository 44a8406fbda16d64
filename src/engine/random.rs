//! Deterministic pseudo-random number generation.
//!
//! Each world owns exactly one [`Mulberry32`] generator, seeded at
//! construction. The same seed and the same call sequence yield a
//! bit-identical stream, which is what makes whole simulations replayable.
//!
//! # Non-goals
//!
//! - This generator is **not cryptographically secure**.
//! - It should not be used for security-sensitive randomness.

/// Mulberry32 generator with a cached Gaussian spare.
#[derive(Clone, Debug)]
pub struct Mulberry32 {
    state: u32,
    spare: Option<f64>,
}

impl Mulberry32 {
    /// Creates a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed, spare: None }
    }

    /// Advances the stream and returns the next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in `[0, 1)`.
    #[inline]
    pub fn next(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Uniform float in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next()
    }

    /// Uniform integer in `[lo, hi]` (inclusive).
    ///
    /// The span is computed in `i128`, so extreme bounds (the full `i64`
    /// range included) cannot overflow.
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        debug_assert!(lo <= hi);
        let span = i128::from(hi) - i128::from(lo) + 1;
        let offset = (self.next() * span as f64) as i128;
        (i128::from(lo) + offset.min(span - 1)) as i64
    }

    /// Returns `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next() < p
    }

    /// Uniformly picks one element, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = (self.next() * items.len() as f64) as usize;
        items.get(index.min(items.len() - 1))
    }

    /// In-place Fisher–Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() * (i + 1) as f64) as usize;
            items.swap(i.min(items.len() - 1), j.min(i));
        }
    }

    /// Normally distributed sample via the Box–Muller polar method.
    ///
    /// Each iteration produces two deviates; the second is cached and
    /// returned by the following call without advancing the stream.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(spare) = self.spare.take() {
            return mean + std_dev * spare;
        }
        loop {
            let u = 2.0 * self.next() - 1.0;
            let v = 2.0 * self.next() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let m = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * m);
                return mean + std_dev * u * m;
            }
        }
    }
}

/// Derives a 32-bit seed from a string (FNV-1a).
///
/// Pure and deterministic: the same input always yields the same seed.
pub fn seed_from_string(input: &str) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
