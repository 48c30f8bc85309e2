// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric transforms: rotate, flip, resize, crop.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use retouch_core::error::{Result, RetouchError};
use retouch_core::{Raster, check_surface};
use tracing::{debug, info, instrument};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rotate clockwise by an arbitrary angle in degrees.
///
/// Multiples of 90 are lossless. Any other angle produces a canvas sized to
/// the rotated bounding box (`w|cos| + h|sin|` by `w|sin| + h|cos|`) with the
/// source centred and transparent black outside it.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn rotate(raster: &Raster, degrees: f32) -> Result<Raster> {
    if !degrees.is_finite() {
        return Err(RetouchError::Range(format!("rotation angle {degrees} is not finite")));
    }
    info!(degrees, "Rotating image");

    let normalised = degrees.rem_euclid(360.0);
    let near = |target: f32| (normalised - target).abs() < 0.01;
    if near(0.0) || near(360.0) {
        return Ok(raster.clone());
    }
    if near(90.0) {
        return raster.derive(imageops::rotate90(raster.as_rgba()));
    }
    if near(180.0) {
        return Ok(raster.with_pixels(imageops::rotate180(raster.as_rgba())));
    }
    if near(270.0) {
        return raster.derive(imageops::rotate270(raster.as_rgba()));
    }

    let (width, height) = raster.dimensions();
    let (out_w, out_h) = rotated_bounds(width, height, normalised);
    check_surface(out_w, out_h)?;

    // Rotate on a canvas large enough for both the source and the rotated
    // bounding box, then cut the bounding box out of its centre.
    let work_w = out_w.max(width);
    let work_h = out_h.max(height);
    check_surface(work_w, work_h)?;
    let mut canvas = RgbaImage::from_pixel(work_w, work_h, TRANSPARENT);
    imageops::replace(
        &mut canvas,
        raster.as_rgba(),
        i64::from((work_w - width) / 2),
        i64::from((work_h - height) / 2),
    );

    let rotated = rotate_about_center(
        &canvas,
        normalised.to_radians(),
        Interpolation::Bilinear,
        TRANSPARENT,
    );
    let cropped = imageops::crop_imm(
        &rotated,
        (work_w - out_w) / 2,
        (work_h - out_h) / 2,
        out_w,
        out_h,
    )
    .to_image();

    debug!(out_w, out_h, "General rotation applied");
    raster.derive(cropped)
}

/// Size of the axis-aligned box enclosing a `width x height` rectangle after
/// rotating it by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let theta = f64::from(degrees).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    // Shave off float noise so an exact fit does not grow by a pixel.
    let fit = |v: f64| (v - 1e-6).ceil().max(1.0) as u32;
    (fit(w * cos + h * sin), fit(w * sin + h * cos))
}

/// Mirror horizontally, vertically, or both (a 180 degree point reflection).
#[instrument(skip(raster))]
pub fn flip(raster: &Raster, horizontal: bool, vertical: bool) -> Raster {
    let pixels = match (horizontal, vertical) {
        (false, false) => return raster.clone(),
        (true, false) => imageops::flip_horizontal(raster.as_rgba()),
        (false, true) => imageops::flip_vertical(raster.as_rgba()),
        (true, true) => imageops::rotate180(raster.as_rgba()),
    };
    raster.with_pixels(pixels)
}

/// Resize using Lanczos3 filtering.
///
/// With `maintain_aspect`, a zero target dimension is derived from the other
/// through the source aspect ratio, and when both are given the image is
/// fitted inside the `target_w x target_h` box: the dimension that would
/// scale more is recomputed from the other. Without it, both dimensions must
/// be non-zero.
#[instrument(skip(raster), fields(from_w = raster.width(), from_h = raster.height()))]
pub fn resize(raster: &Raster, target_w: u32, target_h: u32, maintain_aspect: bool) -> Result<Raster> {
    let (new_w, new_h) = resize_dimensions(raster.dimensions(), target_w, target_h, maintain_aspect)?;
    check_surface(new_w, new_h)?;
    info!(new_w, new_h, "Resizing image");

    if (new_w, new_h) == raster.dimensions() {
        return Ok(raster.clone());
    }
    let resized = imageops::resize(raster.as_rgba(), new_w, new_h, FilterType::Lanczos3);
    raster.derive(resized)
}

/// Compute the output size of [`resize`] without touching pixels.
pub fn resize_dimensions(
    (width, height): (u32, u32),
    target_w: u32,
    target_h: u32,
    maintain_aspect: bool,
) -> Result<(u32, u32)> {
    if target_w == 0 && target_h == 0 {
        return Err(RetouchError::Range("resize target is 0x0".into()));
    }
    if !maintain_aspect {
        if target_w == 0 || target_h == 0 {
            return Err(RetouchError::Range(format!(
                "resize target {target_w}x{target_h} has a zero dimension"
            )));
        }
        return Ok((target_w, target_h));
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let scale_w = f64::from(target_w) / w;
    let scale_h = f64::from(target_h) / h;
    let scaled = |v: f64, scale: f64| (v * scale).round().max(1.0) as u32;

    let dims = if target_h == 0 || (target_w != 0 && scale_w <= scale_h) {
        (target_w, scaled(h, scale_w))
    } else {
        (scaled(w, scale_h), target_h)
    };
    Ok(dims)
}

/// Cut out the `width x height` rectangle at `(x, y)`.
///
/// Fails with `RetouchError::Range` unless the rectangle is non-empty and lies
/// entirely inside the source.
#[instrument(skip(raster), fields(src_w = raster.width(), src_h = raster.height()))]
pub fn crop(raster: &Raster, x: u32, y: u32, width: u32, height: u32) -> Result<Raster> {
    let (src_w, src_h) = raster.dimensions();
    let fits = width > 0
        && height > 0
        && x.checked_add(width).is_some_and(|right| right <= src_w)
        && y.checked_add(height).is_some_and(|bottom| bottom <= src_h);
    if !fits {
        return Err(RetouchError::Range(format!(
            "crop {width}x{height} at ({x}, {y}) does not fit inside {src_w}x{src_h}"
        )));
    }

    info!(x, y, width, height, "Cropping image");
    let cropped = imageops::crop_imm(raster.as_rgba(), x, y, width, height).to_image();
    raster.derive(cropped)
}
