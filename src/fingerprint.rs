use md5::{Digest, Md5};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::sample::ImageStats;

/// Modulus applied to the fingerprint before it is used as a seed.
pub const SEED_MODULUS: u32 = 10_000;

/// Content-derived identifier of a sample's coarse statistics.
///
/// **Hash input** (bit-for-bit, any change breaks reproducibility):
///
/// ```text
/// "(" rows ", " cols ")" format(mean, 2 decimals) format(std_dev, 2 decimals)
/// ```
///
/// e.g. `"(400, 600)120.000.00"` for a flat grey 600x400 frame. The
/// fingerprint is the first 8 lowercase hex digits of the MD5 of that string,
/// i.e. the first four digest bytes read big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u32);

impl Fingerprint {
    pub fn of(stats: &ImageStats) -> Self {
        let key = hash_input(stats);

        let mut hasher = Md5::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();

        Self(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The fingerprint reduced modulo [`SEED_MODULUS`].
    pub fn base_seed(self) -> u32 {
        self.0 % SEED_MODULUS
    }
}

/// The exact string fed to MD5.
pub fn hash_input(stats: &ImageStats) -> String {
    format!(
        "({}, {}){:.2}{:.2}",
        stats.rows, stats.cols, stats.mean, stats.std_dev
    )
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(rows: u32, cols: u32, mean: f64, std_dev: f64) -> ImageStats {
        ImageStats {
            rows,
            cols,
            mean,
            std_dev,
            entropy: 0.0,
        }
    }

    #[test]
    fn flat_grey_reference() {
        let s = stats(400, 600, 120.0, 0.0);
        assert_eq!(hash_input(&s), "(400, 600)120.000.00");

        let fp = Fingerprint::of(&s);
        assert_eq!(fp.to_string(), "56598eb0");
        assert_eq!(fp.base_seed(), 0x5659_8eb0 % 10_000);
        assert_eq!(fp.base_seed(), 9808);
    }

    #[test]
    fn synthetic_xray_reference() {
        let fp = Fingerprint::of(&stats(400, 600, 128.432, 24.5654508609144));
        assert_eq!(fp.to_string(), "229d1102");
        assert_eq!(fp.base_seed(), 8850);
    }

    #[test]
    fn equal_after_rounding_means_equal_fingerprint() {
        let a = Fingerprint::of(&stats(400, 600, 120.001, 30.004));
        let b = Fingerprint::of(&stats(400, 600, 119.998, 29.996));
        assert_eq!(a, b);
    }

    #[test]
    fn any_rounded_input_change_moves_the_fingerprint() {
        let base = Fingerprint::of(&stats(400, 600, 120.0, 30.0));
        assert_ne!(base, Fingerprint::of(&stats(600, 400, 120.0, 30.0)));
        assert_ne!(base, Fingerprint::of(&stats(400, 600, 120.01, 30.0)));
        assert_ne!(base, Fingerprint::of(&stats(400, 600, 120.0, 30.01)));
    }

    #[test]
    fn serializes_as_hex_string() {
        let fp = Fingerprint::of(&stats(400, 600, 120.0, 30.0));
        assert_eq!(serde_json::to_string(&fp).unwrap(), "\"78b0fd91\"");
    }
}
