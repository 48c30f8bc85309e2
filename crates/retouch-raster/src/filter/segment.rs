// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Heuristic background removal.
//
// The background colour is estimated as the average of the four corner
// pixels. Pixels close to it become transparent, with a short linear alpha
// ramp for anti-aliased edges. This is a corner-colour approximation, not
// matting: subjects that touch a corner, or backgrounds with gradients, will
// be cut incorrectly.

use image::Rgba;
use retouch_core::Raster;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Thresholds for [`remove_background`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationOptions {
    /// Euclidean RGB distance at or below which a pixel is background.
    pub threshold: f32,
    /// Width of the alpha ramp above `threshold`.
    pub feather: f32,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            threshold: 30.0,
            feather: 20.0,
        }
    }
}

/// Average colour of the four corner pixels.
pub fn estimate_background(raster: &Raster) -> [f32; 3] {
    let (w, h) = raster.dimensions();
    let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
    let mut sum = [0.0f32; 3];
    for (x, y) in corners {
        let px = raster.pixel(x, y);
        for channel in 0..3 {
            sum[channel] += f32::from(px[channel]);
        }
    }
    sum.map(|s| s / 4.0)
}

/// Make background-coloured pixels transparent.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn remove_background(raster: &Raster, options: &SegmentationOptions) -> Raster {
    let background = estimate_background(raster);
    let threshold = options.threshold.max(0.0);
    let feather = options.feather.max(0.0);
    debug!(?background, threshold, feather, "Background estimated from corners");

    let mut pixels = raster.as_rgba().clone();
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let distance = [r, g, b]
            .iter()
            .zip(background)
            .map(|(&v, bg)| (f32::from(v) - bg).powi(2))
            .sum::<f32>()
            .sqrt();

        let alpha = if distance <= threshold {
            0
        } else if distance < threshold + feather {
            let weight = (distance - threshold) / feather;
            (f32::from(a) * weight).round() as u8
        } else {
            a
        };
        pixel.0[3] = alpha;
    }
    raster.with_pixels(pixels)
}
