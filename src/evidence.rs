use image::DynamicImage;
use img_hash::{HashAlg, HasherConfig};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::fingerprint::Fingerprint;
use crate::sample::ImageSample;

/// Identity of a sample at three strengths.
///
/// - `fingerprint`: statistics only, drives the findings seed
/// - `sha256`: exact pixel content, changes with any single pixel
/// - `phash`: gradient perceptual hash, survives mild re-encoding and blur
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceDigests {
    pub fingerprint: Fingerprint,
    pub sha256: String,
    pub phash: String,
}

impl EvidenceDigests {
    pub fn of(sample: &ImageSample) -> Self {
        let pixels = sample.pixels();

        // dimensions are part of the digest so a transposed buffer differs
        let mut hasher = Sha256::new();
        hasher.update(pixels.width().to_be_bytes());
        hasher.update(pixels.height().to_be_bytes());
        hasher.update(pixels.as_raw());
        let sha256 = hex::encode(hasher.finalize());

        let phasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(8, 8)
            .to_hasher();
        let phash = phasher
            .hash_image(&DynamicImage::ImageLuma8(pixels.clone()))
            .to_base64();

        Self {
            fingerprint: Fingerprint::of(sample.stats()),
            sha256,
            phash,
        }
    }
}
