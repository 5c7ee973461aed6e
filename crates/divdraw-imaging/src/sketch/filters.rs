// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter primitives for sketch extraction -- area downscaling, luma conversion,
// bilateral smoothing, CLAHE, linear contrast, mean-adaptive thresholding,
// 2x2 closing, and median despeckling.
//
// Each filter is a total function from one raster to a new raster. Border
// handling and rounding follow the conventions of the classic computer-vision
// toolkits so that outputs are reproducible bit-for-bit.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::median_filter;

use divdraw_core::types::{BACKGROUND, INK};

// -- Geometry -----------------------------------------------------------------

/// Dimensions after fitting the larger side to `max_dimension`.
///
/// Images already within bounds are returned unchanged. The larger side becomes
/// exactly `max_dimension`; the other is `trunc(side * max_dimension / larger)`,
/// never less than one pixel. Square images scale by width.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width.max(height) <= max_dimension {
        return (width, height);
    }
    if width >= height {
        let scale = max_dimension as f64 / width as f64;
        (max_dimension, ((height as f64 * scale) as u32).max(1))
    } else {
        let scale = max_dimension as f64 / height as f64;
        (((width as f64 * scale) as u32).max(1), max_dimension)
    }
}

/// Area-averaging resample used for downscaling.
///
/// Each destination pixel is the coverage-weighted mean of the source pixels
/// its footprint overlaps.
pub fn resize_area(image: &RgbImage, new_width: u32, new_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if (width, height) == (new_width, new_height) {
        return image.clone();
    }

    let x_taps = area_taps(width, new_width);
    let y_taps = area_taps(height, new_height);

    // Horizontal pass into a float buffer, then vertical pass with rounding.
    let mut rows = vec![[0f64; 3]; new_width as usize * height as usize];
    for y in 0..height {
        for (dx, taps) in x_taps.iter().enumerate() {
            let mut acc = [0f64; 3];
            for &(sx, weight) in taps {
                let Rgb(px) = *image.get_pixel(sx, y);
                for c in 0..3 {
                    acc[c] += px[c] as f64 * weight;
                }
            }
            rows[y as usize * new_width as usize + dx] = acc;
        }
    }

    let mut output = RgbImage::new(new_width, new_height);
    for (dy, taps) in y_taps.iter().enumerate() {
        for dx in 0..new_width as usize {
            let mut acc = [0f64; 3];
            for &(sy, weight) in taps {
                let row = rows[sy as usize * new_width as usize + dx];
                for c in 0..3 {
                    acc[c] += row[c] * weight;
                }
            }
            output.put_pixel(
                dx as u32,
                dy as u32,
                Rgb([saturate(acc[0]), saturate(acc[1]), saturate(acc[2])]),
            );
        }
    }
    output
}

/// Per-destination-index list of `(source index, weight)` pairs for area
/// resampling along one axis.
fn area_taps(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len as i64 - 1;

    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let cell = scale.min(src_len as f64 - start);

            let mut first_full = start.ceil() as i64;
            let last_full = (end.floor() as i64).min(last);
            first_full = first_full.min(last_full);

            let mut taps = Vec::with_capacity(scale.ceil() as usize + 2);
            if first_full as f64 - start > 1e-3 {
                taps.push(((first_full - 1) as u32, (first_full as f64 - start) / cell));
            }
            for s in first_full..last_full {
                taps.push((s as u32, 1.0 / cell));
            }
            if end - last_full as f64 > 1e-3 {
                let partial = (end - last_full as f64).min(1.0).min(cell);
                taps.push((last_full as u32, partial / cell));
            }
            taps
        })
        .collect()
}

/// Nearest-neighbour resample. Never invents new sample values, so binary
/// rasters stay binary.
pub fn resize_nearest(image: &GrayImage, new_width: u32, new_height: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if (width, height) == (new_width, new_height) {
        return image.clone();
    }
    GrayImage::from_fn(new_width, new_height, |x, y| {
        let sx = ((x as u64 * width as u64) / new_width as u64).min(width as u64 - 1) as u32;
        let sy = ((y as u64 * height as u64) / new_height as u64).min(height as u64 - 1) as u32;
        *image.get_pixel(sx, sy)
    })
}

// -- Colour -------------------------------------------------------------------

/// BT.601 luma (`0.299 R + 0.587 G + 0.114 B`) in 14-bit fixed point.
pub fn luma(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const HALF: u32 = 1 << 13;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let value = (r as u32 * R + g as u32 * G + b as u32 * B + HALF) >> 14;
        Luma([value as u8])
    })
}

// -- Smoothing and contrast ---------------------------------------------------

/// Edge-preserving bilateral smoothing.
///
/// `diameter` selects a circular support of radius `diameter / 2`. Weights are
/// the product of a spatial Gaussian (`sigma_space`) and an intensity-difference
/// Gaussian (`sigma_color`). Borders reflect without repeating the edge pixel.
pub fn bilateral(image: &GrayImage, diameter: u32, sigma_color: f64, sigma_space: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    let radius = (diameter / 2).max(1) as i64;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let color_weight: Vec<f64> = (0..256)
        .map(|d| ((d * d) as f64 * color_coeff).exp())
        .collect();

    let mut kernel: Vec<(i64, i64, f64)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist2 = (dx * dx + dy * dy) as f64;
            if dist2.sqrt() > radius as f64 {
                continue;
            }
            kernel.push((dx, dy, (dist2 * space_coeff).exp()));
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let center = image.get_pixel(x, y).0[0] as i32;
        let mut sum = 0f64;
        let mut weight_sum = 0f64;
        for &(dx, dy, space_w) in &kernel {
            let sx = reflect_101(x as i64 + dx, width);
            let sy = reflect_101(y as i64 + dy, height);
            let value = image.get_pixel(sx, sy).0[0] as i32;
            let w = space_w * color_weight[(value - center).unsigned_abs() as usize];
            sum += value as f64 * w;
            weight_sum += w;
        }
        Luma([saturate(sum / weight_sum)])
    })
}

/// Contrast-limited adaptive histogram equalisation over a `tiles x tiles` grid.
///
/// Images whose sides are not multiples of the grid are padded on the right and
/// bottom by reflection before tile histograms are built. Each tile histogram is
/// clipped at `clip_limit * tile_area / 256`; the excess is spread uniformly and
/// the remainder stepped across the bins. Output pixels blend the four nearest
/// tile mappings bilinearly.
pub fn clahe(image: &GrayImage, clip_limit: f64, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();

    let (padded_w, padded_h) = if width % tiles == 0 && height % tiles == 0 {
        (width, height)
    } else {
        (width + tiles - width % tiles, height + tiles - height % tiles)
    };
    let tile_w = padded_w / tiles;
    let tile_h = padded_h / tiles;
    let tile_area = (tile_w * tile_h) as usize;

    let limit = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f64 / 256.0) as usize).max(1)
    } else {
        usize::MAX
    };
    let lut_scale = 255.0f32 / tile_area as f32;

    let mut luts = vec![[0u8; 256]; (tiles * tiles) as usize];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let mut hist = [0usize; 256];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect_101(y as i64, height);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect_101(x as i64, width);
                    hist[image.get_pixel(sx, sy).0[0] as usize] += 1;
                }
            }

            let mut clipped = 0usize;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    clipped += *bin - limit;
                    *bin = limit;
                }
            }
            let batch = clipped / 256;
            let mut residual = clipped - batch * 256;
            for bin in hist.iter_mut() {
                *bin += batch;
            }
            if residual != 0 {
                let step = (256 / residual).max(1);
                let mut i = 0;
                while i < 256 && residual > 0 {
                    hist[i] += 1;
                    residual -= 1;
                    i += step;
                }
            }

            let lut = &mut luts[(ty * tiles + tx) as usize];
            let mut cumulative = 0usize;
            for (value, count) in hist.iter().enumerate() {
                cumulative += count;
                lut[value] = saturate((cumulative as f32 * lut_scale) as f64);
            }
        }
    }

    let x_blend: Vec<(usize, usize, f32)> = (0..width).map(|x| tile_blend(x, tile_w, tiles)).collect();
    let y_blend: Vec<(usize, usize, f32)> = (0..height).map(|y| tile_blend(y, tile_h, tiles)).collect();
    let tiles = tiles as usize;

    GrayImage::from_fn(width, height, |x, y| {
        let value = image.get_pixel(x, y).0[0] as usize;
        let (tx1, tx2, xa) = x_blend[x as usize];
        let (ty1, ty2, ya) = y_blend[y as usize];
        let at = |ty: usize, tx: usize| luts[ty * tiles + tx][value] as f32;
        let top = at(ty1, tx1) * (1.0 - xa) + at(ty1, tx2) * xa;
        let bottom = at(ty2, tx1) * (1.0 - xa) + at(ty2, tx2) * xa;
        Luma([saturate((top * (1.0 - ya) + bottom * ya) as f64)])
    })
}

/// Neighbouring tile indices and blend weight for one pixel coordinate.
fn tile_blend(coord: u32, tile_len: u32, tiles: u32) -> (usize, usize, f32) {
    let pos = coord as f32 / tile_len as f32 - 0.5;
    let low = pos.floor();
    let weight = pos - low;
    let first = (low as i64).max(0) as usize;
    let second = ((low as i64 + 1).min(tiles as i64 - 1)) as usize;
    (first, second, weight)
}

/// `clamp(round(|v * alpha + beta|), 0, 255)` per pixel, evaluated in single
/// precision.
pub fn linear_boost(image: &GrayImage, alpha: f64, beta: f64) -> GrayImage {
    let (alpha, beta) = (alpha as f32, beta as f32);
    let lut: Vec<u8> = (0..256u16)
        .map(|v| saturate((f32::from(v) * alpha + beta).abs() as f64))
        .collect();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([lut[image.get_pixel(x, y).0[0] as usize]])
    })
}

// -- Binarization -------------------------------------------------------------

/// Mean-adaptive threshold.
///
/// For each pixel the mean of the `(2 * block_radius + 1)²` neighbourhood
/// (replicated border, rounded to an integer) minus `offset` is the local
/// threshold. Pixels strictly above it become background; the rest become ink.
pub fn adaptive_threshold(image: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let integral = replicated_integral(image, block_radius);
    let side = 2 * block_radius as usize + 1;
    let area = (side * side) as u64;
    let stride = width as usize + 2 * block_radius as usize + 1;

    GrayImage::from_fn(width, height, |x, y| {
        let (x1, y1) = (x as usize, y as usize);
        let (x2, y2) = (x1 + side, y1 + side);
        let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
            - integral[y1 * stride + x2]
            - integral[y2 * stride + x1];
        // Rounded mean; odd areas never produce exact halves.
        let mean = ((2 * sum + area) / (2 * area)) as i32;
        let value = image.get_pixel(x, y).0[0] as i32;
        Luma([if value > mean - offset { BACKGROUND } else { INK }])
    })
}

/// Summed-area table of the image padded by `radius` replicated pixels on every
/// side. `table[y * stride + x]` holds the sum over padded rows `[0, y)` and
/// columns `[0, x)`, with `stride = padded_width + 1`.
fn replicated_integral(image: &GrayImage, radius: u32) -> Vec<u64> {
    let (width, height) = image.dimensions();
    let r = radius as i64;
    let padded_w = width as usize + 2 * radius as usize;
    let padded_h = height as usize + 2 * radius as usize;
    let stride = padded_w + 1;
    let mut table = vec![0u64; stride * (padded_h + 1)];

    for py in 0..padded_h {
        let sy = (py as i64 - r).clamp(0, height as i64 - 1) as u32;
        let mut row_sum = 0u64;
        for px in 0..padded_w {
            let sx = (px as i64 - r).clamp(0, width as i64 - 1) as u32;
            row_sum += image.get_pixel(sx, sy).0[0] as u64;
            table[(py + 1) * stride + px + 1] = row_sum + table[py * stride + px + 1];
        }
    }
    table
}

// -- Morphology ---------------------------------------------------------------

/// Closing with a 2x2 square anchored at its bottom-right cell: a dilation
/// followed by an erosion over the window `{x-1, x} x {y-1, y}`. Samples
/// outside the image do not participate.
pub fn close_2x2(image: &GrayImage) -> GrayImage {
    let dilated = window_2x2(image, u8::max);
    window_2x2(&dilated, u8::min)
}

fn window_2x2(image: &GrayImage, pick: fn(u8, u8) -> u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let mut acc = image.get_pixel(x, y).0[0];
        if x > 0 {
            acc = pick(acc, image.get_pixel(x - 1, y).0[0]);
        }
        if y > 0 {
            acc = pick(acc, image.get_pixel(x, y - 1).0[0]);
        }
        if x > 0 && y > 0 {
            acc = pick(acc, image.get_pixel(x - 1, y - 1).0[0]);
        }
        Luma([acc])
    })
}

/// 3x3 median filter.
pub fn despeckle(image: &GrayImage) -> GrayImage {
    median_filter(image, 1, 1)
}

// -- Helpers ------------------------------------------------------------------

/// Mirror an out-of-range index back into `[0, len)` without repeating the
/// edge sample (`dcb|abcd|cba`).
fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i as u32;
        }
    }
}

/// Round to nearest (ties to even) and clamp into the `u8` range.
fn saturate(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}
