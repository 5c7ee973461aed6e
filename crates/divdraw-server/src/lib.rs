// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Divide & Draw HTTP service -- routing, request input resolution, the
// generative polishing proxy, and the server lifecycle.

pub mod enhance;
pub mod handlers;
pub mod input;
pub mod server;

pub use enhance::{GeminiBackend, GenerativeBackend, UnconfiguredBackend};
pub use server::{AppState, SketchServer, router};
