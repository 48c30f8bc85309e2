// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 3x3 neighbourhood filters: sharpen, blur, edge detection, median denoise.
//
// All of them use a "valid" policy: only pixels with a full 3x3 neighbourhood
// are rewritten, so the 1-pixel frame is copied through untouched. Results are
// written to a fresh buffer; the source is never read while being written.
// RGB channels are processed independently and alpha is passed through.

use image::RgbaImage;
use retouch_core::Raster;
use tracing::{debug, instrument};

use super::to_channel;

/// A 3x3 kernel plus the divisor its weighted sum is scaled by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    pub weights: [[f32; 3]; 3],
    pub divisor: f32,
}

impl Kernel {
    pub const SHARPEN: Kernel = Kernel {
        weights: [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]],
        divisor: 1.0,
    };

    pub const BLUR: Kernel = Kernel {
        weights: [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]],
        divisor: 16.0,
    };

    pub const EDGE_DETECT: Kernel = Kernel {
        weights: [[-1.0, -1.0, -1.0], [-1.0, 8.0, -1.0], [-1.0, -1.0, -1.0]],
        divisor: 1.0,
    };
}

pub fn sharpen(raster: &Raster) -> Raster {
    convolve(raster, &Kernel::SHARPEN)
}

pub fn blur(raster: &Raster) -> Raster {
    convolve(raster, &Kernel::BLUR)
}

pub fn edge_detect(raster: &Raster) -> Raster {
    convolve(raster, &Kernel::EDGE_DETECT)
}

/// Convolve the interior of the image with `kernel`.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn convolve(raster: &Raster, kernel: &Kernel) -> Raster {
    let src = raster.as_rgba();
    let (width, height) = src.dimensions();
    if width < 3 || height < 3 {
        debug!("Image smaller than the kernel; nothing to convolve");
        return raster.clone();
    }

    let mut out: RgbaImage = src.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sums = [0.0f32; 3];
            for (ky, row) in kernel.weights.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = src.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1).0;
                    for (sum, value) in sums.iter_mut().zip(px) {
                        *sum += *weight * value as f32;
                    }
                }
            }
            let target = out.get_pixel_mut(x, y);
            for (channel, sum) in target.0.iter_mut().zip(sums) {
                *channel = to_channel(sum / kernel.divisor);
            }
        }
    }
    raster.with_pixels(out)
}

/// Replace each interior pixel's RGB channels with the median of its 3x3
/// neighbourhood.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn median_denoise(raster: &Raster) -> Raster {
    let src = raster.as_rgba();
    let (width, height) = src.dimensions();
    if width < 3 || height < 3 {
        return raster.clone();
    }

    let mut out = src.clone();
    let mut window = [[0u8; 9]; 3];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut i = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let px = src.get_pixel(nx, ny).0;
                    for channel in 0..3 {
                        window[channel][i] = px[channel];
                    }
                    i += 1;
                }
            }
            let target = out.get_pixel_mut(x, y);
            for (channel, values) in window.iter_mut().enumerate() {
                values.sort_unstable();
                target.0[channel] = values[4];
            }
        }
    }
    raster.with_pixels(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn noisy(width: u32, height: u32) -> Raster {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 31 + y * 17) * 7 % 256) as u8;
            Rgba([v, 255 - v, v / 2, (100 + x % 50) as u8])
        });
        Raster::from_rgba(pixels, retouch_core::RasterFormat::Png, 0).unwrap()
    }

    fn border_unchanged(before: &Raster, after: &Raster) {
        let (w, h) = before.dimensions();
        for x in 0..w {
            assert_eq!(before.pixel(x, 0), after.pixel(x, 0));
            assert_eq!(before.pixel(x, h - 1), after.pixel(x, h - 1));
        }
        for y in 0..h {
            assert_eq!(before.pixel(0, y), after.pixel(0, y));
            assert_eq!(before.pixel(w - 1, y), after.pixel(w - 1, y));
        }
    }

    #[test]
    fn convolution_never_touches_the_border() {
        let img = noisy(23, 11);
        for filtered in [sharpen(&img), blur(&img), edge_detect(&img), median_denoise(&img)] {
            border_unchanged(&img, &filtered);
        }
    }

    #[test]
    fn alpha_is_passed_through() {
        let img = noisy(10, 10);
        let out = blur(&img);
        for (a, b) in img.samples().chunks_exact(4).zip(out.samples().chunks_exact(4)) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn flat_image_is_fixed_point_of_sharpen_and_blur() {
        let img = Raster::filled(8, 8, [90, 140, 200, 255]).unwrap();
        assert_eq!(sharpen(&img), img);
        assert_eq!(blur(&img), img);
    }

    #[test]
    fn edge_detect_zeroes_flat_interior() {
        let img = Raster::filled(8, 8, [90, 140, 200, 255]).unwrap();
        let out = edge_detect(&img);
        assert_eq!(out.pixel(4, 4), [0, 0, 0, 255]);
        assert_eq!(out.pixel(0, 0), [90, 140, 200, 255]);
    }

    #[test]
    fn blur_averages_a_single_spike() {
        let mut pixels = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
        pixels.put_pixel(2, 2, Rgba([160, 0, 0, 255]));
        let img = Raster::from_rgba(pixels, retouch_core::RasterFormat::Png, 0).unwrap();

        let out = blur(&img);
        assert_eq!(out.pixel(2, 2)[0], 40); // 160 * 4 / 16
        assert_eq!(out.pixel(1, 1)[0], 10); // 160 * 1 / 16
        assert_eq!(out.pixel(2, 1)[0], 20); // 160 * 2 / 16
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut pixels = RgbaImage::from_pixel(5, 5, Rgba([50, 60, 70, 255]));
        pixels.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let img = Raster::from_rgba(pixels, retouch_core::RasterFormat::Png, 0).unwrap();

        assert_eq!(median_denoise(&img).pixel(2, 2), [50, 60, 70, 255]);
    }

    #[test]
    fn tiny_images_pass_through() {
        let img = noisy(2, 7);
        assert_eq!(sharpen(&img), img);
        assert_eq!(median_denoise(&img), img);
    }
}
