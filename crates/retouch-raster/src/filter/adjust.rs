// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel colour adjustment pipeline.
//
// Stages run in a fixed order: brightness, contrast, saturation, hue, gamma.
// Every stage clamps to [0, 255] before handing its result to the next one.

use image::Rgba;
use retouch_core::Raster;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{luma, to_channel};

/// Colour adjustment settings. `Default` is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorAdjustments {
    /// Multiplicative brightness; 1.0 leaves pixels unchanged.
    pub brightness: f32,
    /// Contrast factor around mid-grey; 1.0 is neutral, 0.0 flattens to grey.
    pub contrast: f32,
    /// Saturation factor; 0.0 is greyscale, 1.0 is neutral.
    pub saturation: f32,
    /// Hue rotation in degrees; 0.0 skips the stage.
    pub hue: f32,
    /// Gamma; values above 1.0 brighten mid-tones.
    pub gamma: f32,
}

impl Default for ColorAdjustments {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            hue: 0.0,
            gamma: 1.0,
        }
    }
}

impl ColorAdjustments {
    /// Whether applying these settings would leave every pixel unchanged.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    fn hue_matrix(&self) -> Option<[[f32; 3]; 3]> {
        if self.hue.rem_euclid(360.0).abs() < f32::EPSILON {
            return None;
        }
        // Rotation about the achromatic (1,1,1) axis.
        let (sin, cos) = self.hue.to_radians().sin_cos();
        let third = (1.0 - cos) / 3.0;
        let root = (1.0f32 / 3.0).sqrt() * sin;
        let a = cos + third;
        let b = third - root;
        let c = third + root;
        Some([[a, b, c], [c, a, b], [b, c, a]])
    }

    /// Run the pipeline on one RGB triple (0..255 floats).
    pub(crate) fn apply_rgb(&self, rgb: [f32; 3], hue: Option<&[[f32; 3]; 3]>) -> [f32; 3] {
        let clamp = |v: f32| v.clamp(0.0, 255.0);

        let mut px = rgb.map(|v| clamp(v * self.brightness));
        px = px.map(|v| clamp(((v / 255.0 - 0.5) * self.contrast + 0.5) * 255.0));

        let gray = luma(px[0], px[1], px[2]);
        px = px.map(|v| clamp(gray + (v - gray) * self.saturation));

        if let Some(m) = hue {
            let [r, g, b] = px;
            px = [
                clamp(m[0][0] * r + m[0][1] * g + m[0][2] * b),
                clamp(m[1][0] * r + m[1][1] * g + m[1][2] * b),
                clamp(m[2][0] * r + m[2][1] * g + m[2][2] * b),
            ];
        }

        if self.gamma > 0.0 && (self.gamma - 1.0).abs() > f32::EPSILON {
            let inv = 1.0 / self.gamma;
            px = px.map(|v| clamp((v / 255.0).powf(inv) * 255.0));
        }
        px
    }
}

/// Apply the colour adjustment pipeline. Alpha is preserved.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn adjust_colors(raster: &Raster, settings: &ColorAdjustments) -> Raster {
    if settings.is_neutral() {
        return raster.clone();
    }
    debug!(?settings, "Adjusting colours");

    let hue = settings.hue_matrix();
    let mut pixels = raster.as_rgba().clone();
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let [r, g, b] = settings.apply_rgb([r as f32, g as f32, b as f32], hue.as_ref());
        *pixel = Rgba([to_channel(r), to_channel(g), to_channel(b), a]);
    }
    raster.with_pixels(pixels)
}

/// Scale saturation only.
pub fn saturate(raster: &Raster, factor: f32) -> Raster {
    adjust_colors(
        raster,
        &ColorAdjustments {
            saturation: factor,
            ..Default::default()
        },
    )
}

/// Scale contrast only.
pub fn contrast(raster: &Raster, factor: f32) -> Raster {
    adjust_colors(
        raster,
        &ColorAdjustments {
            contrast: factor,
            ..Default::default()
        },
    )
}

/// Convert to greyscale using Rec. 601 luma. Alpha is preserved.
pub fn grayscale(raster: &Raster) -> Raster {
    saturate(raster, 0.0)
}
