//! Reproduction of the legacy MT19937 draw sequence the findings depend on.
//!
//! Only three primitives are needed, each defined by the exact arithmetic
//! below rather than by `rand`'s distribution code (which maps bits to floats
//! differently):
//!
//! - seeding: `init_genrand(seed)` (linear recurrence, not `init_by_array`)
//! - `random_sample`: 53-bit double from two outputs, `((a >> 5) * 2^26 + (b >> 6)) / 2^53`
//! - weighted choice: normalised running-sum CDF, index = count of CDF entries `<= u`

use rand_mt::Mt19937GenRand32;

pub struct LegacyRng {
    mt: Mt19937GenRand32,
}

impl LegacyRng {
    pub fn seeded(seed: u32) -> Self {
        Self {
            mt: Mt19937GenRand32::new(seed),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.mt.next_u32()
    }

    /// Uniform double in `[0, 1)`.
    pub fn random_sample(&mut self) -> f64 {
        let a = (self.mt.next_u32() >> 5) as f64;
        let b = (self.mt.next_u32() >> 6) as f64;
        (a * 67_108_864.0 + b) / 9_007_199_254_740_992.0
    }

    /// Uniform double in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let range = high - low;
        low + range * self.random_sample()
    }

    /// Index drawn according to `weights`. Consumes exactly one `random_sample`.
    ///
    /// Weights need not sum to one; they are normalised by their total.
    pub fn choice_weighted(&mut self, weights: &[f64]) -> usize {
        let mut cdf = Vec::with_capacity(weights.len());
        let mut acc = 0.0;
        for w in weights {
            acc += w;
            cdf.push(acc);
        }
        let total = acc;
        for c in cdf.iter_mut() {
            *c /= total;
        }

        let u = self.random_sample();
        let idx = cdf.partition_point(|&c| c <= u);
        idx.min(weights.len().saturating_sub(1))
    }
}
