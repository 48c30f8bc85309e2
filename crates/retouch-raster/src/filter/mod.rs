// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter library: colour adjustment, 3x3 convolution and median denoise,
// histogram auto-enhancement, corner-heuristic background removal, and
// artistic stylization.

pub mod adjust;
pub mod convolve;
pub mod enhance;
pub mod segment;
pub mod stylize;

/// Rec. 601 luma weights used for desaturation and brightness mapping.
pub(crate) fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Round and clamp a channel value into `0..=255`.
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
