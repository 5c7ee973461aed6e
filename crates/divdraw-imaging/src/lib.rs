// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// divdraw-imaging -- Image processing for the Divide & Draw backend.
//
// Provides the codec adapter (decode, PNG encode, base64 data URLs), the
// photo-to-sketch extraction pipeline, and pixel-overlap accuracy scoring.

pub mod codec;
pub mod sketch;

// Re-export the primary entry points so callers can use
// `divdraw_imaging::convert_to_sketch` etc.
pub use codec::{PNG_MIME, strip_data_url, to_data_url};
pub use sketch::pipeline::{BinarizeProfile, binarize, convert_to_sketch, to_binary_edge};
pub use sketch::score::{Evaluation, compute_accuracy_metrics, evaluate, render_overlay};
