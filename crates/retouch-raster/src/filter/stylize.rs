// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artistic stylization filters.
//
// These are cheap approximations of the named looks, not
// physically modelled media.

use image::{GrayImage, Luma, Rgba};
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use retouch_core::Raster;
use tracing::{debug, instrument};

use super::adjust::{contrast, saturate};
use super::{luma, to_channel};

/// Strength of the unsharp emphasis in [`sketch`].
const SKETCH_AMOUNT: f32 = 1.5;
/// Per-channel multipliers giving watercolor its cool wash.
const WATERCOLOR_BOOST: [f32; 3] = [1.1, 1.05, 1.15];
const OIL_STEP: u8 = 32;
const OIL_SATURATION: f32 = 1.3;
const CARTOON_STEP: u8 = 64;
const CARTOON_CONTRAST: f32 = 1.5;

/// Greyscale with unsharp-mask style edge emphasis.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn sketch(raster: &Raster, sigma: f32) -> Raster {
    let src = raster.as_rgba();
    let gray = GrayImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, _] = src.get_pixel(x, y).0;
        Luma([to_channel(luma(f32::from(r), f32::from(g), f32::from(b)))])
    });
    let blurred = gaussian_blur_f32(&gray, sigma.max(0.1));

    let mut pixels = src.clone();
    for (x, y, pixel) in pixels.enumerate_pixels_mut() {
        let g = f32::from(gray.get_pixel(x, y).0[0]);
        let b = f32::from(blurred.get_pixel(x, y).0[0]);
        let v = to_channel(g + SKETCH_AMOUNT * (g - b));
        *pixel = Rgba([v, v, v, pixel.0[3]]);
    }
    raster.with_pixels(pixels)
}

/// Channel boosts plus random per-pixel jitter of up to `jitter` levels.
///
/// Uses the thread-local RNG, so two runs on the same input differ. Use
/// [`watercolor_with_rng`] for reproducible output.
pub fn watercolor(raster: &Raster, jitter: u8) -> Raster {
    watercolor_with_rng(raster, jitter, &mut rand::thread_rng())
}

/// [`watercolor`] driven by a caller-supplied RNG.
#[instrument(skip(raster, rng), fields(width = raster.width(), height = raster.height()))]
pub fn watercolor_with_rng<R: Rng>(raster: &Raster, jitter: u8, rng: &mut R) -> Raster {
    let spread = i16::from(jitter);
    let mut pixels = raster.as_rgba().clone();
    for pixel in pixels.pixels_mut() {
        for (channel, boost) in WATERCOLOR_BOOST.iter().enumerate() {
            let noise = if spread == 0 {
                0.0
            } else {
                f32::from(rng.gen_range(-spread..=spread))
            };
            pixel.0[channel] = to_channel(f32::from(pixel.0[channel]) * boost + noise);
        }
    }
    debug!(jitter, "Watercolor applied");
    raster.with_pixels(pixels)
}

/// Quantize each RGB channel down to a multiple of `step`.
pub fn posterize(raster: &Raster, step: u8) -> Raster {
    let step = step.max(1);
    let mut pixels = raster.as_rgba().clone();
    for pixel in pixels.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = *channel / step * step;
        }
    }
    raster.with_pixels(pixels)
}

/// Coarse quantization (steps of 32) with boosted saturation.
#[instrument(skip(raster))]
pub fn oil_paint(raster: &Raster) -> Raster {
    saturate(&posterize(raster, OIL_STEP), OIL_SATURATION)
}

/// Heavy quantization (steps of 64) followed by a contrast push.
#[instrument(skip(raster))]
pub fn cartoon(raster: &Raster) -> Raster {
    contrast(&posterize(raster, CARTOON_STEP), CARTOON_CONTRAST)
}
