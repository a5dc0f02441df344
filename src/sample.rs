use image::{GrayImage, Luma};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DentalError, DentalResult};

/// Coarse statistics of a single-channel sample.
///
/// `std_dev` is the population deviation (ddof = 0). `entropy` is the base-2
/// Shannon entropy of the 256-bin histogram, taken over non-empty bins only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStats {
    pub rows: u32,
    pub cols: u32,
    pub mean: f64,
    pub std_dev: f64,
    pub entropy: f64,
}

/// An immutable grey-level image plus its statistics.
///
/// Every transform produces a new sample; the pixel buffer is shared behind an
/// `Arc` so snapshots handed to worker threads are cheap.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pixels: Arc<GrayImage>,
    stats: ImageStats,
}

impl ImageSample {
    pub fn from_gray(pixels: GrayImage) -> DentalResult<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(DentalError::EmptyImage { width, height });
        }
        let stats = compute_stats(&pixels);
        Ok(Self {
            pixels: Arc::new(pixels),
            stats,
        })
    }

    /// Decode an image file and convert it to luma.
    pub fn open(path: &Path) -> DentalResult<Self> {
        if !path.exists() {
            return Err(DentalError::ImageNotFound(path.display().to_string()));
        }
        let decoded = image::open(path)?;
        Self::from_gray(decoded.to_luma8())
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn stats(&self) -> &ImageStats {
        &self.stats
    }

    /// `(rows, cols)`, row-major like the pixel grid.
    pub fn shape(&self) -> (u32, u32) {
        (self.stats.rows, self.stats.cols)
    }

    pub fn histogram(&self) -> [u64; 256] {
        histogram(&self.pixels)
    }
}

fn histogram(pixels: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for Luma([v]) in pixels.pixels() {
        bins[*v as usize] += 1;
    }
    bins
}

fn compute_stats(pixels: &GrayImage) -> ImageStats {
    let bins = histogram(pixels);
    let total = (pixels.width() as u64 * pixels.height() as u64) as f64;

    // Per-bin accumulation keeps the mean exact for any realistic image size.
    let sum: f64 = bins
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();
    let mean = sum / total;

    let var = bins
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .map(|(v, &c)| {
            let d = v as f64 - mean;
            d * d * c as f64
        })
        .sum::<f64>()
        / total;

    // fold from +0.0 so a single-level image reports 0, not -0
    let entropy = bins
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| c as f64 / total)
        .fold(0.0, |acc, p| acc - p * p.log2());

    ImageStats {
        rows: pixels.height(),
        cols: pixels.width(),
        mean,
        std_dev: var.sqrt(),
        entropy,
    }
}

/// Width and height of the built-in X-ray.
pub const SYNTHETIC_WIDTH: u32 = 600;
pub const SYNTHETIC_HEIGHT: u32 = 400;

const SYNTHETIC_BACKGROUND: u8 = 120;
const SYNTHETIC_TOOTH: u8 = 200;

/// Stand-in panoramic X-ray: a grey field with an upper and a lower row of
/// eight bright tooth blocks. Block bounds are inclusive on both ends.
pub fn synthetic_xray() -> ImageSample {
    let mut img = GrayImage::from_pixel(
        SYNTHETIC_WIDTH,
        SYNTHETIC_HEIGHT,
        Luma([SYNTHETIC_BACKGROUND]),
    );
    for i in 0..8u32 {
        let x = 150 + i * 50;
        fill_rect(&mut img, x, 150, x + 30, 200, SYNTHETIC_TOOTH);
        fill_rect(&mut img, x, 250, x + 30, 300, SYNTHETIC_TOOTH);
    }
    let stats = compute_stats(&img);
    ImageSample {
        pixels: Arc::new(img),
        stats,
    }
}

fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
    for y in y0..=y1.min(img.height() - 1) {
        for x in x0..=x1.min(img.width() - 1) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_has_zero_spread() {
        let sample = ImageSample::from_gray(GrayImage::from_pixel(600, 400, Luma([120]))).unwrap();
        let stats = sample.stats();
        assert_eq!(sample.shape(), (400, 600));
        assert_eq!(stats.mean, 120.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.entropy, 0.0);
    }

    #[test]
    fn two_level_image_has_one_bit_of_entropy() {
        let mut img = GrayImage::from_pixel(600, 400, Luma([90]));
        for y in 0..200 {
            for x in 0..600 {
                img.put_pixel(x, y, Luma([150]));
            }
        }
        let stats = *ImageSample::from_gray(img).unwrap().stats();
        assert_eq!(stats.mean, 120.0);
        assert_eq!(stats.std_dev, 30.0);
        assert!((stats.entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn synthetic_xray_layout() {
        let sample = synthetic_xray();
        let hist = sample.histogram();
        // 16 blocks of 31x51 inclusive pixels.
        assert_eq!(hist[200], 16 * 31 * 51);
        assert_eq!(hist[120], 600 * 400 - 16 * 31 * 51);
        assert!((sample.stats().mean - 128.432).abs() < 1e-9);
        assert!((sample.stats().std_dev - 24.5654508609144).abs() < 1e-9);
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = ImageSample::from_gray(GrayImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, DentalError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ImageSample::open(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, DentalError::ImageNotFound(_)));
    }
}
