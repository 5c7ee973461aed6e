// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sketch binarization pipeline -- one parameterised sequence of filters shared
// by the photo-to-sketch converter and the accuracy scorer.

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, info, instrument};

use divdraw_core::error::Result;

use super::filters;
use crate::codec;

/// Larger side of every raster entering the pipeline.
pub const MAX_DIMENSION: u32 = 800;

/// Half-width of the 9x9 neighbourhood used for adaptive thresholding.
pub const THRESHOLD_BLOCK_RADIUS: u32 = 4;

/// Amount subtracted from the local mean before thresholding.
pub const THRESHOLD_OFFSET: i32 = 5;

const BILATERAL_DIAMETER: u32 = 9;
const BILATERAL_SIGMA_COLOR: f64 = 75.0;
const BILATERAL_SIGMA_SPACE: f64 = 75.0;
const CLAHE_CLIP_LIMIT: f64 = 3.0;
const CLAHE_TILES: u32 = 8;
const BOOST_ALPHA: f64 = 1.3;
const BOOST_BETA: f64 = 10.0;

/// Which optional stages [`binarize`] runs around the shared
/// downscale / grayscale / threshold / median core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarizeProfile {
    /// Bilateral smoothing before thresholding.
    pub denoise: bool,
    /// CLAHE before thresholding.
    pub equalize: bool,
    /// Linear contrast/brightness boost before thresholding.
    pub boost: bool,
    /// 2x2 closing after thresholding.
    pub close: bool,
}

impl BinarizeProfile {
    /// Full pipeline used to turn photos into clean line art.
    pub const SKETCH: Self = Self {
        denoise: true,
        equalize: true,
        boost: true,
        close: true,
    };

    /// Lean pipeline used to compare two drawings literally.
    pub const SCORING: Self = Self {
        denoise: false,
        equalize: false,
        boost: false,
        close: false,
    };
}

/// Run the binarization pipeline on a colour raster.
///
/// 1. Downscale so the larger side is at most [`MAX_DIMENSION`] (area averaging)
/// 2. BT.601 grayscale
/// 3. Optional bilateral denoise, CLAHE, and linear boost
/// 4. Mean-adaptive threshold (9x9, offset 5)
/// 5. Optional 2x2 closing
/// 6. 3x3 median despeckle
///
/// The result only contains ink (0) and background (255) samples.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn binarize(image: &RgbImage, profile: BinarizeProfile) -> GrayImage {
    let (width, height) = filters::fit_within(image.width(), image.height(), MAX_DIMENSION);
    let mut gray = if (width, height) == image.dimensions() {
        filters::luma(image)
    } else {
        debug!(width, height, "Downscaling before binarization");
        filters::luma(&filters::resize_area(image, width, height))
    };

    if profile.denoise {
        gray = filters::bilateral(
            &gray,
            BILATERAL_DIAMETER,
            BILATERAL_SIGMA_COLOR,
            BILATERAL_SIGMA_SPACE,
        );
    }
    if profile.equalize {
        gray = filters::clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_TILES);
    }
    if profile.boost {
        gray = filters::linear_boost(&gray, BOOST_ALPHA, BOOST_BETA);
    }

    let mut edges = filters::adaptive_threshold(&gray, THRESHOLD_BLOCK_RADIUS, THRESHOLD_OFFSET);
    if profile.close {
        edges = filters::close_2x2(&edges);
    }
    let edges = filters::despeckle(&edges);
    debug!(?profile, "Binarization complete");
    edges
}

/// Convert an uploaded photo into a clean line sketch, returned as PNG bytes.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn convert_to_sketch(data: &[u8]) -> Result<Vec<u8>> {
    let image = codec::decode(data)?;
    let sketch = binarize(&image, BinarizeProfile::SKETCH);
    info!(
        width = sketch.width(),
        height = sketch.height(),
        "Sketch extracted"
    );
    codec::encode_png(&DynamicImage::ImageLuma8(sketch))
}

/// Decode an image and reduce it to the binary edge raster used for scoring.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn to_binary_edge(data: &[u8]) -> Result<GrayImage> {
    let image = codec::decode(data)?;
    Ok(binarize(&image, BinarizeProfile::SCORING))
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use divdraw_core::error::DivDrawError;
    use divdraw_core::types::{BACKGROUND, INK};

    /// Light background with a dark diagonal band and a dark disc.
    fn synthetic_photo(width: u32, height: u32) -> RgbImage {
        let (cx, cy) = (width as f32 * 0.7, height as f32 * 0.4);
        let radius = width.min(height) as f32 * 0.15;
        RgbImage::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f32, y as f32);
            let on_band = (fx * height as f32 / width as f32 - fy).abs() < 3.0;
            let in_disc = (fx - cx).powi(2) + (fy - cy).powi(2) < radius * radius;
            if on_band || in_disc {
                Rgb([30, 40, 50])
            } else {
                Rgb([200 + (x % 7) as u8, 190, 180 + (y % 5) as u8])
            }
        })
    }

    fn png(image: RgbImage) -> Vec<u8> {
        codec::encode_png(&DynamicImage::ImageRgb8(image)).unwrap()
    }

    fn samples_are_binary(image: &GrayImage) -> bool {
        image.pixels().all(|p| p.0[0] == INK || p.0[0] == BACKGROUND)
    }

    #[test]
    fn sketch_profile_output_is_binary() {
        let edges = binarize(&synthetic_photo(120, 90), BinarizeProfile::SKETCH);
        assert!(samples_are_binary(&edges));
        assert!(edges.pixels().any(|p| p.0[0] == INK));
        assert!(edges.pixels().any(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn scoring_profile_output_is_binary() {
        let edges = binarize(&synthetic_photo(64, 64), BinarizeProfile::SCORING);
        assert!(samples_are_binary(&edges));
    }

    #[test]
    fn large_inputs_are_downscaled_to_800() {
        let edges = binarize(&synthetic_photo(1000, 500), BinarizeProfile::SCORING);
        assert_eq!(edges.dimensions(), (800, 400));
    }

    #[test]
    fn small_inputs_keep_their_dimensions() {
        let edges = binarize(&synthetic_photo(321, 123), BinarizeProfile::SKETCH);
        assert_eq!(edges.dimensions(), (321, 123));
    }

    #[test]
    fn portrait_inputs_fit_height() {
        let edges = binarize(&synthetic_photo(400, 1600), BinarizeProfile::SCORING);
        assert_eq!(edges.dimensions(), (200, 800));
    }

    #[test]
    fn blank_page_has_no_ink() {
        let blank = RgbImage::from_pixel(50, 40, Rgb([255, 255, 255]));
        let edges = binarize(&blank, BinarizeProfile::SKETCH);
        assert!(edges.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn convert_to_sketch_returns_grayscale_png() {
        let bytes = convert_to_sketch(&png(synthetic_photo(200, 150))).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 150));
        assert!(samples_are_binary(&decoded.to_luma8()));
    }

    #[test]
    fn convert_to_sketch_is_deterministic() {
        let input = png(synthetic_photo(90, 60));
        assert_eq!(convert_to_sketch(&input).unwrap(), convert_to_sketch(&input).unwrap());
    }

    #[test]
    fn convert_rejects_non_images() {
        let err = convert_to_sketch(b"GIF89a but not really").unwrap_err();
        assert!(matches!(err, DivDrawError::Decode(_)));
    }

    #[test]
    fn to_binary_edge_finds_drawn_strokes() {
        let edges = to_binary_edge(&png(synthetic_photo(100, 100))).unwrap();
        assert!(samples_are_binary(&edges));
        assert!(edges.pixels().any(|p| p.0[0] == INK));
    }
}
