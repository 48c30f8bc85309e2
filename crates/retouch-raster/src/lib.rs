// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// retouch-raster — Pixel-level processing for the Retouch edit engine.
//
// Provides the decode/encode boundary (codec), geometric transforms (rotate,
// flip, resize, crop), the filter library (colour adjustment, convolution,
// auto-enhance, background removal, stylization), ASCII-art rendering, and
// the `EditOp` catalogue that ties tool ids and settings to filter calls.
//
// Every operation is a pure function on an owned buffer.

pub mod ascii;
pub mod codec;
pub mod filter;
pub mod ops;
pub mod transform;

pub use ascii::{AsciiOptions, ColorMode};
pub use codec::{decode, decode_guessed, encode};
pub use filter::adjust::ColorAdjustments;
pub use filter::segment::SegmentationOptions;
pub use ops::EditOp;
