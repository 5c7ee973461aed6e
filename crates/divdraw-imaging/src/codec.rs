// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec adapter -- decode uploaded bytes into rasters, encode rasters as PNG,
// and wrap/unwrap base64 data URLs. Operates on in-memory images using the
// `image` and `base64` crates.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

use divdraw_core::error::{DivDrawError, Result};

/// MIME type of every image this backend produces.
pub const PNG_MIME: &str = "image/png";

/// Decode a compressed image (PNG, JPEG, ...) into an 8-bit RGB raster.
///
/// Alpha is dropped without compositing; grayscale inputs are replicated across
/// the three channels.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<RgbImage> {
    if data.is_empty() {
        return Err(DivDrawError::Decode("image data is empty".into()));
    }
    let img = image::load_from_memory(data).map_err(|err| DivDrawError::Decode(err.to_string()))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    Ok(img.to_rgb8())
}

/// Encode any raster (grayscale or colour) as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| DivDrawError::Encode(err.to_string()))?;
    Ok(buffer)
}

/// Resize decoded bytes to exactly `width` x `height` (Lanczos3) and return
/// PNG bytes. Used to fit generated images back onto the caller's canvas.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn resize_exact_png(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data).map_err(|err| DivDrawError::Decode(err.to_string()))?;
    let resized = if img.width() == width && img.height() == height {
        img
    } else {
        debug!(
            from_w = img.width(),
            from_h = img.height(),
            width,
            height,
            "Resizing to target canvas"
        );
        img.resize_exact(width, height, FilterType::Lanczos3)
    };
    encode_png(&resized)
}

/// Wrap bytes in a `data:<mime>;base64,<payload>` URL.
pub fn to_data_url(data: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

/// Recover bytes from a data URL or a bare base64 string.
///
/// A `data:` prefix is discarded up to and including the first comma. ASCII
/// whitespace inside the payload (line-wrapped base64) is ignored.
pub fn strip_data_url(input: &str) -> Result<Vec<u8>> {
    let payload = match input.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, payload)) => payload,
            None => {
                return Err(DivDrawError::MalformedInput(
                    "data URL has no ',' separator".into(),
                ));
            }
        },
        None => input,
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| DivDrawError::MalformedInput(format!("invalid base64: {err}")))
}
