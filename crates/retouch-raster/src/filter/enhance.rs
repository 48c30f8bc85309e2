// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Histogram auto-enhancement.
//
// Pass 1 gathers per-channel min/max/mean. Each channel then gets a 256-entry
// lookup table composing auto-levels, a fixed contrast boost and a colour
// balance nudge, and pass 2 maps every pixel through its tables.

use image::Rgba;
use retouch_core::Raster;
use tracing::{debug, instrument};

/// Contrast factor applied after auto-levels (+20%).
const CONTRAST_BOOST: f32 = 1.2;
/// Fraction of a channel mean's distance from mid-grey that is corrected.
const BALANCE_PULL: f32 = 0.1;
const MID_GREY: f32 = 128.0;

/// Per-channel statistics over the whole image (RGB only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub min: [u8; 3],
    pub max: [u8; 3],
    pub mean: [f32; 3],
}

impl ChannelStats {
    /// Gather min, max and mean for each RGB channel in one pass.
    pub fn collect(raster: &Raster) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        let mut sum = [0u64; 3];

        for pixel in raster.as_rgba().pixels() {
            for channel in 0..3 {
                let v = pixel.0[channel];
                min[channel] = min[channel].min(v);
                max[channel] = max[channel].max(v);
                sum[channel] += u64::from(v);
            }
        }

        let count = (raster.width() as u64 * raster.height() as u64).max(1) as f64;
        let mean = sum.map(|s| (s as f64 / count) as f32);
        Self { min, max, mean }
    }
}

/// Build the lookup table for one channel, or `None` when the channel is flat
/// (`min == max`) and must be left alone.
fn channel_table(min: u8, max: u8, mean: f32) -> Option<[u8; 256]> {
    if min == max {
        return None;
    }
    let (lo, span) = (f32::from(min), f32::from(max) - f32::from(min));
    let tone = |v: f32| {
        let levelled = ((v - lo) / span * 255.0).clamp(0.0, 255.0);
        ((levelled - MID_GREY) * CONTRAST_BOOST + MID_GREY).clamp(0.0, 255.0)
    };
    // Measured from the mean as it lands after levels and contrast.
    let shift = (MID_GREY - tone(mean)) * BALANCE_PULL;

    let mut table = [0u8; 256];
    for (v, slot) in table.iter_mut().enumerate() {
        *slot = (tone(v as f32) + shift).round().clamp(0.0, 255.0) as u8;
    }
    Some(table)
}

/// Auto-levels, contrast boost and colour balance in one deterministic pass.
///
/// Channels whose values are all identical are passed through unchanged.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn auto_enhance(raster: &Raster) -> Raster {
    let stats = ChannelStats::collect(raster);
    debug!(?stats, "Channel statistics gathered");

    let tables: [Option<[u8; 256]>; 3] =
        std::array::from_fn(|c| channel_table(stats.min[c], stats.max[c], stats.mean[c]));
    if tables.iter().all(Option::is_none) {
        return raster.clone();
    }

    let mut pixels = raster.as_rgba().clone();
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let map = |channel: usize, v: u8| tables[channel].map_or(v, |t| t[v as usize]);
        *pixel = Rgba([map(0, r), map(1, g), map(2, b), a]);
    }
    raster.with_pixels(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn ramp(lo: u8, hi: u8) -> Raster {
        let pixels = RgbaImage::from_fn(64, 4, |x, _| {
            let v = lo + ((u32::from(hi - lo) * x) / 63) as u8;
            Rgba([v, v, 200, 255])
        });
        Raster::from_rgba(pixels, retouch_core::RasterFormat::Png, 0).unwrap()
    }

    #[test]
    fn flat_channels_are_left_unmodified() {
        let img = Raster::filled(10, 10, [17, 128, 250, 90]).unwrap();
        assert_eq!(auto_enhance(&img), img);
    }

    #[test]
    fn flat_channel_survives_next_to_a_stretched_one() {
        let img = ramp(60, 120);
        let out = auto_enhance(&img);
        // Blue is constant 200 and must not move.
        assert!(out.samples().chunks_exact(4).all(|px| px[2] == 200));
        // Red is stretched well beyond its original 60..=120 range.
        let reds: Vec<u8> = out.samples().chunks_exact(4).map(|px| px[0]).collect();
        assert!(*reds.iter().min().unwrap() < 20);
        assert!(*reds.iter().max().unwrap() > 235);
    }

    #[test]
    fn output_is_deterministic() {
        let img = ramp(30, 90);
        assert_eq!(auto_enhance(&img), auto_enhance(&img));
    }

    #[test]
    fn stats_cover_each_channel() {
        let stats = ChannelStats::collect(&ramp(10, 73));
        assert_eq!(stats.min, [10, 10, 200]);
        assert_eq!(stats.max, [73, 73, 200]);
        assert!((stats.mean[2] - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn balance_pulls_dark_mean_toward_mid_grey() {
        // Mostly dark pixels with a few bright ones: the mean stays low after
        // levels, so the nudge must lift the table relative to pure levels.
        let table = channel_table(0, 255, 40.0).unwrap();
        let without_pull = ((40.0f32 - MID_GREY) * CONTRAST_BOOST + MID_GREY).round() as u8;
        assert!(table[40] > without_pull);
    }

    #[test]
    fn balance_uses_the_toned_mean() {
        // Levels map a mean of 75 in 50..=100 to about 127.4, so there is
        // almost nothing left to pull; the raw mean would shift by 5.
        let table = channel_table(50, 100, 75.0).unwrap();
        assert_eq!(table[75], 127);
    }
}
