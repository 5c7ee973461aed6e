// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accuracy scoring -- pixel-overlap metrics between a reference sketch and a
// user's tracing, plus a red-on-reference diff overlay.

use std::borrow::Cow;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use tracing::{debug, info, instrument};

use divdraw_core::error::Result;
use divdraw_core::types::{AccuracyMetrics, INK};

use super::filters;
use super::pipeline::to_binary_edge;
use crate::codec;

/// Overlay colour for user strokes.
const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

/// Metrics plus the PNG-encoded overlay for one comparison.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: AccuracyMetrics,
    pub visualization_png: Vec<u8>,
}

/// Compare two binary edge rasters.
///
/// `user` is resampled (nearest-neighbour) onto the reference grid when the
/// dimensions differ.
pub fn compute_accuracy_metrics(reference: &GrayImage, user: &GrayImage) -> AccuracyMetrics {
    let user = align_to(reference, user);

    let mut intersection = 0u64;
    let mut union = 0u64;
    let mut reference_ink = 0u64;
    for (r, u) in reference.pixels().zip(user.pixels()) {
        let r_ink = r.0[0] == INK;
        let u_ink = u.0[0] == INK;
        intersection += (r_ink && u_ink) as u64;
        union += (r_ink || u_ink) as u64;
        reference_ink += r_ink as u64;
    }

    let metrics = AccuracyMetrics::from_counts(intersection, union, reference_ink);
    debug!(intersection, union, reference_ink, "Ink overlap counted");
    metrics
}

/// Reference replicated into RGB with every user ink pixel painted red.
pub fn render_overlay(reference: &GrayImage, user: &GrayImage) -> RgbImage {
    let user = align_to(reference, user);
    RgbImage::from_fn(reference.width(), reference.height(), |x, y| {
        if user.get_pixel(x, y).0[0] == INK {
            HIGHLIGHT
        } else {
            let v = reference.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        }
    })
}

/// Score `user` against `original` from raw image bytes.
///
/// Both images go through the lean scoring binarization once; the same rasters
/// feed the metrics and the overlay.
#[instrument(skip_all, fields(original_len = original.len(), user_len = user.len()))]
pub fn evaluate(original: &[u8], user: &[u8]) -> Result<Evaluation> {
    let reference = to_binary_edge(original)?;
    let user = to_binary_edge(user)?;

    let metrics = compute_accuracy_metrics(&reference, &user);
    let overlay = render_overlay(&reference, &user);
    let visualization_png = codec::encode_png(&DynamicImage::ImageRgb8(overlay))?;

    info!(
        coverage = metrics.coverage_percent,
        iou = metrics.iou_percent,
        "Sketch evaluated"
    );
    Ok(Evaluation {
        metrics,
        visualization_png,
    })
}

fn align_to<'a>(reference: &GrayImage, user: &'a GrayImage) -> Cow<'a, GrayImage> {
    if reference.dimensions() == user.dimensions() {
        Cow::Borrowed(user)
    } else {
        debug!(
            from = ?user.dimensions(),
            to = ?reference.dimensions(),
            "Resampling user sketch onto reference grid"
        );
        Cow::Owned(filters::resize_nearest(
            user,
            reference.width(),
            reference.height(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use divdraw_core::types::BACKGROUND;

    fn raster(width: u32, height: u32, ink: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if ink(x, y) { INK } else { BACKGROUND }])
        })
    }

    fn png_of(image: &GrayImage) -> Vec<u8> {
        codec::encode_png(&DynamicImage::ImageLuma8(image.clone())).unwrap()
    }

    #[test]
    fn identical_rasters_score_full_marks() {
        let r = raster(40, 30, |x, y| x == y || x == 20);
        let m = compute_accuracy_metrics(&r, &r);
        assert_eq!(m.coverage_percent, 100.0);
        assert_eq!(m.iou_percent, 100.0);
        assert_eq!(m.intersection, m.union);
    }

    #[test]
    fn disjoint_ink_scores_zero() {
        let r = raster(20, 20, |x, _| x < 5);
        let u = raster(20, 20, |x, _| x > 15);
        let m = compute_accuracy_metrics(&r, &u);
        assert_eq!(m.intersection, 0);
        assert_eq!(m.coverage_percent, 0.0);
        assert_eq!(m.iou_percent, 0.0);
    }

    #[test]
    fn blank_reference_does_not_divide_by_zero() {
        let r = raster(10, 10, |_, _| false);
        let u = raster(10, 10, |x, _| x == 3);
        let m = compute_accuracy_metrics(&r, &u);
        assert_eq!(m.reference_ink, 0);
        assert_eq!(m.coverage_percent, 0.0);
        assert_eq!(m.iou_percent, 0.0);
    }

    #[test]
    fn both_blank_scores_zero() {
        let r = raster(10, 10, |_, _| false);
        let m = compute_accuracy_metrics(&r, &r);
        assert_eq!((m.coverage_percent, m.iou_percent), (0.0, 0.0));
    }

    #[test]
    fn all_ink_pair_is_bounded() {
        let r = raster(10, 10, |_, _| true);
        let u = raster(10, 10, |x, _| x % 2 == 0);
        let m = compute_accuracy_metrics(&r, &u);
        assert_eq!(m.coverage_percent, 50.0);
        assert_eq!(m.iou_percent, 50.0);
    }

    #[test]
    fn partial_overlap_percentages() {
        // Reference: columns 0..4 (40 px), user: columns 2..8 (60 px), shared 20 px.
        let r = raster(10, 10, |x, _| x < 4);
        let u = raster(10, 10, |x, _| (2..8).contains(&x));
        let m = compute_accuracy_metrics(&r, &u);
        assert_eq!(m.intersection, 20);
        assert_eq!(m.union, 80);
        assert_eq!(m.coverage_percent, 50.0);
        assert_eq!(m.iou_percent, 25.0);
    }

    #[test]
    fn mismatched_user_is_resampled_onto_reference() {
        let r = raster(10, 10, |x, _| x < 5);
        let u = raster(20, 20, |x, _| x < 10);
        let m = compute_accuracy_metrics(&r, &u);
        assert_eq!(m.coverage_percent, 100.0);
        assert_eq!(m.iou_percent, 100.0);
    }

    #[test]
    fn overlay_paints_user_ink_red_over_reference() {
        let r = raster(4, 1, |x, _| x == 0 || x == 1);
        let u = raster(4, 1, |x, _| x == 1 || x == 2);
        let overlay = render_overlay(&r, &u);
        assert_eq!(overlay.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(overlay.get_pixel(1, 0), &HIGHLIGHT);
        assert_eq!(overlay.get_pixel(2, 0), &HIGHLIGHT);
        assert_eq!(overlay.get_pixel(3, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn overlay_uses_reference_dimensions() {
        let r = raster(12, 8, |_, _| false);
        let u = raster(30, 30, |_, _| true);
        let overlay = render_overlay(&r, &u);
        assert_eq!(overlay.dimensions(), (12, 8));
        assert!(overlay.pixels().all(|p| *p == HIGHLIGHT));
    }

    #[test]
    fn evaluate_same_drawing_twice_is_perfect() {
        let drawing = raster(60, 60, |x, y| (28..32).contains(&x) || (28..32).contains(&y));
        let bytes = png_of(&drawing);
        let evaluation = evaluate(&bytes, &bytes).unwrap();
        assert_eq!(evaluation.metrics.coverage_percent, 100.0);
        assert_eq!(evaluation.metrics.iou_percent, 100.0);

        let overlay = image::load_from_memory(&evaluation.visualization_png).unwrap();
        assert_eq!((overlay.width(), overlay.height()), (60, 60));
    }

    #[test]
    fn evaluate_rejects_undecodable_user_image() {
        let drawing = raster(16, 16, |x, _| x == 8);
        let err = evaluate(&png_of(&drawing), b"nope").unwrap_err();
        assert!(!err.is_client_error());
    }
}
