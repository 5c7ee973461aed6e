// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sketch module -- filter primitives, the shared binarization pipeline, and
// accuracy scoring.

pub mod filters;
pub mod pipeline;
pub mod score;

pub use pipeline::{BinarizeProfile, MAX_DIMENSION};
pub use score::Evaluation;
