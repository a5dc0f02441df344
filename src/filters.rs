//! Synthetic damage and the canned enhancement pass.
//!
//! Every function returns a new [`ImageSample`]; inputs are never touched.

use image::{imageops, GrayImage, ImageBuffer, Luma};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DentalError, DentalResult};
use crate::sample::ImageSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Degradation {
    /// Gaussian noise followed by a light blur.
    Thermal,
    /// Heavy blur and washed-out contrast.
    Water,
    /// Square patches knocked out to black.
    Trauma,
}

impl Degradation {
    pub fn label(self) -> &'static str {
        match self {
            Degradation::Thermal => "Thermal Damage",
            Degradation::Water => "Water Damage",
            Degradation::Trauma => "Trauma Damage",
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Damage severity as a 1..=10 level; filters work on `level / 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Severity(u8);

impl Severity {
    pub const MAX_LEVEL: u8 = 10;

    pub fn from_level(level: u8) -> DentalResult<Self> {
        if (1..=Self::MAX_LEVEL).contains(&level) {
            Ok(Self(level))
        } else {
            Err(DentalError::InvalidSeverity(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self(5)
    }
}

const THERMAL_NOISE_SCALE: f64 = 50.0;
const WATER_BLUR_SCALE: f64 = 2.0;
const WATER_CONTRAST: f64 = 0.6;
const TRAUMA_PATCHES_SCALE: f64 = 3.0;
const TRAUMA_PATCH_SIDE_SCALE: f64 = 20.0;

pub const ENHANCE_CONTRAST: f64 = 2.0;
pub const ENHANCE_SHARPNESS: f64 = 2.0;

/// 3x3 smoothing kernel (centre-weighted, normalised by its sum of 13).
const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

pub fn degrade<R: Rng + ?Sized>(
    sample: &ImageSample,
    kind: Degradation,
    severity: Severity,
    rng: &mut R,
) -> DentalResult<ImageSample> {
    let s = severity.fraction();
    let src = sample.pixels();

    let out = match kind {
        Degradation::Thermal => {
            let noisy = add_noise(src, THERMAL_NOISE_SCALE * s, rng)?;
            gaussian_blur(&noisy, s)
        }
        Degradation::Water => {
            let blurred = gaussian_blur(src, WATER_BLUR_SCALE * s);
            contrast(&blurred, WATER_CONTRAST)
        }
        Degradation::Trauma => knock_out_patches(src, s, rng),
    };

    ImageSample::from_gray(out)
}

/// Contrast x2, then sharpness x2.
pub fn enhance(sample: &ImageSample) -> DentalResult<ImageSample> {
    let stretched = contrast(sample.pixels(), ENHANCE_CONTRAST);
    ImageSample::from_gray(sharpen(&stretched, ENHANCE_SHARPNESS))
}

fn add_noise<R: Rng + ?Sized>(src: &GrayImage, sigma: f64, rng: &mut R) -> DentalResult<GrayImage> {
    let normal = Normal::new(0.0, sigma).map_err(|_| DentalError::Noise(sigma))?;
    let mut out = src.clone();
    for px in out.pixels_mut() {
        let v = f64::from(px[0]) + normal.sample(rng);
        px[0] = v.clamp(0.0, 255.0) as u8;
    }
    Ok(out)
}

fn gaussian_blur(src: &GrayImage, sigma: f64) -> GrayImage {
    // zero radius is the identity, not imageops' fallback sigma
    if sigma <= 0.0 {
        return src.clone();
    }
    imageops::blur(src, sigma as f32)
}

fn knock_out_patches<R: Rng + ?Sized>(src: &GrayImage, s: f64, rng: &mut R) -> GrayImage {
    let mut out = src.clone();
    let (w, h) = out.dimensions();
    let patches = (TRAUMA_PATCHES_SCALE * s) as u32;
    let side = (TRAUMA_PATCH_SIDE_SCALE * s) as u32;
    if side >= w || side >= h {
        return out;
    }

    for _ in 0..patches {
        let x0 = rng.gen_range(0..w - side);
        let y0 = rng.gen_range(0..h - side);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                out.put_pixel(x, y, Luma([0]));
            }
        }
    }
    out
}

/// Linear interpolation from `degenerate` towards `image` by `factor`,
/// truncated into `0..=255`. Factors above 1 extrapolate.
fn blend(degenerate: u8, image: u8, factor: f64) -> u8 {
    let d = f64::from(degenerate);
    let v = d + factor * (f64::from(image) - d);
    v.clamp(0.0, 255.0) as u8
}

/// Scale distance from the rounded mean grey level.
fn contrast(src: &GrayImage, factor: f64) -> GrayImage {
    let (w, h) = src.dimensions();
    let total = f64::from(w) * f64::from(h);
    let sum: f64 = src.pixels().map(|p| f64::from(p[0])).sum();
    let mean = (sum / total + 0.5).floor().clamp(0.0, 255.0) as u8;

    ImageBuffer::from_fn(w, h, |x, y| Luma([blend(mean, src.get_pixel(x, y)[0], factor)]))
}

/// Push each interior pixel away from its smoothed neighbourhood. The one
/// pixel border is kept as is.
fn sharpen(src: &GrayImage, factor: f64) -> GrayImage {
    let smoothed: GrayImage = imageops::filter3x3(src, &SMOOTH_KERNEL);
    let (w, h) = src.dimensions();

    ImageBuffer::from_fn(w, h, |x, y| {
        let orig = src.get_pixel(x, y)[0];
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            Luma([orig])
        } else {
            Luma([blend(smoothed.get_pixel(x, y)[0], orig, factor)])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::synthetic_xray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat(value: u8) -> ImageSample {
        ImageSample::from_gray(GrayImage::from_pixel(64, 48, Luma([value]))).unwrap()
    }

    #[test]
    fn severity_bounds() {
        assert!(Severity::from_level(0).is_err());
        assert!(Severity::from_level(11).is_err());
        assert_eq!(Severity::from_level(10).unwrap().fraction(), 1.0);
        assert_eq!(Severity::from_level(3).unwrap().level(), 3);
    }

    #[test]
    fn enhance_leaves_flat_image_alone() {
        let src = flat(120);
        let out = enhance(&src).unwrap();
        assert_eq!(out.pixels(), src.pixels());
    }

    #[test]
    fn enhance_stretches_contrast() {
        let src = synthetic_xray();
        let out = enhance(&src).unwrap();
        assert!(out.stats().std_dev > src.stats().std_dev);
        assert_eq!(out.shape(), src.shape());
    }

    #[test]
    fn blend_extrapolates_and_clamps() {
        assert_eq!(blend(100, 150, 2.0), 200);
        assert_eq!(blend(100, 200, 2.0), 255);
        assert_eq!(blend(100, 20, 2.0), 0);
        assert_eq!(blend(100, 150, 0.6), 130);
    }

    #[test]
    fn trauma_blacks_out_patches() {
        let src = flat(200);
        let mut rng = StdRng::seed_from_u64(11);
        let severity = Severity::from_level(10).unwrap();
        let out = degrade(&src, Degradation::Trauma, severity, &mut rng).unwrap();
        let black = out.histogram()[0];
        // three 20x20 patches, possibly overlapping
        assert!(black >= 400 && black <= 1200, "black pixels: {black}");
        assert_eq!(src.histogram()[0], 0);
    }

    #[test]
    fn trauma_patch_larger_than_image_is_skipped() {
        let tiny = ImageSample::from_gray(GrayImage::from_pixel(10, 10, Luma([50]))).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let out = degrade(&tiny, Degradation::Trauma, Severity::from_level(10).unwrap(), &mut rng)
            .unwrap();
        assert_eq!(out.pixels(), tiny.pixels());
    }

    #[test]
    fn water_damage_flattens_contrast() {
        let src = synthetic_xray();
        let mut rng = StdRng::seed_from_u64(0);
        let out = degrade(&src, Degradation::Water, Severity::default(), &mut rng).unwrap();
        assert!(out.stats().std_dev < src.stats().std_dev);
    }

    #[test]
    fn thermal_damage_is_reproducible_with_a_seed() {
        let src = synthetic_xray();
        let severity = Severity::from_level(7).unwrap();
        let a = degrade(&src, Degradation::Thermal, severity, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = degrade(&src, Degradation::Thermal, severity, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.pixels(), b.pixels());
        assert_ne!(a.pixels(), src.pixels());
    }
}
