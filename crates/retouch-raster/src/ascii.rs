// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ASCII-art rendering.
//
// The image is divided into a grid of `columns` cells per row. Rows are
// `columns * (height / width) * 0.5` because terminal glyphs are roughly twice
// as tall as they are wide. Each cell's mean brightness picks a character from
// a 10-step ramp, darkest first.

use std::fmt::Write as _;
use std::time::Instant;

use retouch_core::error::{Result, RetouchError};
use retouch_core::{FilterOutput, FilterResult, Raster};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::filter::luma;

/// Brightness ramp from darkest (`@`) to lightest (space).
pub const RAMP: &[u8; 10] = b"@%#*+=-:. ";

/// Height-to-width ratio of a character cell.
pub const GLYPH_ASPECT: f32 = 0.5;

/// How per-character colour is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Characters only.
    #[default]
    Plain,
    /// 24-bit ANSI foreground escapes, reset at the end of each row.
    Ansi,
    /// One `<span style="color:rgb(..)">` per character.
    Html,
}

/// Settings for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsciiOptions {
    /// Characters per row.
    pub columns: u32,
    pub color: ColorMode,
}

impl Default for AsciiOptions {
    fn default() -> Self {
        Self {
            columns: 80,
            color: ColorMode::Plain,
        }
    }
}

/// Grid size (columns, rows) used for a `width x height` image.
///
/// Columns never exceed the image width: a cell is at least one pixel wide.
/// Rows follow `columns * height / width * 0.5`, at least one.
pub fn grid_size(width: u32, height: u32, columns: u32) -> (u32, u32) {
    let columns = columns.min(width).max(1);
    let rows = (columns as f32 * height as f32 / width as f32 * GLYPH_ASPECT).round();
    (columns, (rows as u32).clamp(1, height.max(1)))
}

/// Ramp character for a brightness in `0.0..=255.0`.
pub fn ramp_char(brightness: f32) -> char {
    let last = (RAMP.len() - 1) as f32;
    let index = (brightness.clamp(0.0, 255.0) / 255.0 * last).round() as usize;
    RAMP[index] as char
}

/// Render the raster as ASCII art. Rows are separated by `\n` with no
/// trailing newline. Transparent pixels are composited over white.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn render(raster: &Raster, options: &AsciiOptions) -> Result<String> {
    if options.columns == 0 {
        return Err(RetouchError::Range("ASCII rendering needs at least one column".into()));
    }
    let (width, height) = raster.dimensions();
    let (columns, rows) = grid_size(width, height, options.columns);
    debug!(columns, rows, "ASCII grid computed");

    let span = |index: u32, count: u32, extent: u32| {
        let start = (u64::from(index) * u64::from(extent) / u64::from(count)) as u32;
        let end = (u64::from(index + 1) * u64::from(extent) / u64::from(count)) as u32;
        (start.min(extent - 1), end.max(start + 1).min(extent))
    };

    // Both factors are bounded by the image dimensions.
    let mut out = String::with_capacity((columns as usize + 1).saturating_mul(rows as usize));
    for row in 0..rows {
        if row > 0 {
            out.push('\n');
        }
        let (y0, y1) = span(row, rows, height);
        for column in 0..columns {
            let (x0, x1) = span(column, columns, width);
            let [r, g, b] = cell_mean(raster, x0, x1, y0, y1);
            let glyph = ramp_char(luma(r, g, b));
            let rgb = [r, g, b].map(|v| v.round() as u8);
            match options.color {
                ColorMode::Plain => out.push(glyph),
                ColorMode::Ansi => {
                    let _ = write!(out, "\x1b[38;2;{};{};{}m{glyph}", rgb[0], rgb[1], rgb[2]);
                }
                ColorMode::Html => {
                    let _ = write!(
                        out,
                        "<span style=\"color:rgb({},{},{})\">{glyph}</span>",
                        rgb[0], rgb[1], rgb[2]
                    );
                }
            }
        }
        if options.color == ColorMode::Ansi {
            out.push_str("\x1b[0m");
        }
    }
    Ok(out)
}

/// [`render`] wrapped in a timed `FilterResult`.
pub fn render_result(raster: &Raster, options: &AsciiOptions) -> Result<FilterResult> {
    let started = Instant::now();
    let text = render(raster, options)?;
    Ok(FilterResult {
        output: FilterOutput::Text(text),
        tool_id: "ascii".into(),
        elapsed: started.elapsed(),
    })
}

/// Mean RGB of the cell, with alpha composited over white.
fn cell_mean(raster: &Raster, x0: u32, x1: u32, y0: u32, y1: u32) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    for y in y0..y1 {
        for x in x0..x1 {
            let [r, g, b, a] = raster.pixel(x, y);
            let coverage = f32::from(a) / 255.0;
            for (acc, v) in sum.iter_mut().zip([r, g, b]) {
                *acc += f32::from(v) * coverage + 255.0 * (1.0 - coverage);
            }
        }
    }
    let count = ((x1 - x0) * (y1 - y0)) as f32;
    sum.map(|s| s / count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_image_renders_only_spaces() {
        let white = Raster::filled(80, 80, [255, 255, 255, 255]).unwrap();
        let art = render(&white, &AsciiOptions::default()).unwrap();

        let rows: Vec<&str> = art.split('\n').collect();
        assert_eq!(rows.len(), 40);
        assert!(rows.iter().all(|row| row.len() == 80));
        assert!(art.chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn row_count_follows_glyph_aspect_formula() {
        // rows = columns * height / width * 0.5, so 80 columns over 80x40 give 20.
        let white = Raster::filled(80, 40, [255, 255, 255, 255]).unwrap();
        let art = render(&white, &AsciiOptions::default()).unwrap();
        assert_eq!(art.lines().count(), 20);
        assert!(art.lines().all(|row| row == " ".repeat(80)));
    }

    #[test]
    fn black_maps_to_densest_glyph() {
        let black = Raster::filled(10, 10, [0, 0, 0, 255]).unwrap();
        let art = render(&black, &AsciiOptions { columns: 10, color: ColorMode::Plain }).unwrap();
        assert!(art.chars().filter(|c| *c != '\n').all(|c| c == '@'));
    }

    #[test]
    fn ramp_is_monotonic() {
        assert_eq!(ramp_char(0.0), '@');
        assert_eq!(ramp_char(255.0), ' ');
        assert_eq!(ramp_char(128.0), '=');
        let position = |c: char| RAMP.iter().position(|&r| r as char == c).unwrap();
        let mut last = 0;
        for v in 0..=255 {
            let p = position(ramp_char(v as f32));
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn transparent_pixels_read_as_white() {
        let clear = Raster::filled(4, 8, [0, 0, 0, 0]).unwrap();
        let art = render(&clear, &AsciiOptions { columns: 4, color: ColorMode::Plain }).unwrap();
        assert_eq!(art, "    \n    \n    \n    ");
    }

    #[test]
    fn colour_modes_wrap_each_glyph() {
        let red = Raster::filled(2, 4, [255, 0, 0, 255]).unwrap();
        let html = render(&red, &AsciiOptions { columns: 2, color: ColorMode::Html }).unwrap();
        assert_eq!(html.matches("<span style=\"color:rgb(255,0,0)\">").count(), 4);

        let ansi = render(&red, &AsciiOptions { columns: 2, color: ColorMode::Ansi }).unwrap();
        assert!(ansi.starts_with("\x1b[38;2;255;0;0m"));
        assert_eq!(ansi.matches("\x1b[0m").count(), 2);
    }

    #[test]
    fn columns_are_capped_at_image_width() {
        let img = Raster::filled(3, 3, [255, 255, 255, 255]).unwrap();
        let art = render(&img, &AsciiOptions { columns: 12, color: ColorMode::Plain }).unwrap();
        assert_eq!(art, "   \n   ");
    }

    #[test]
    fn huge_column_count_renders_single_pixel() {
        let img = Raster::filled(1, 1, [255, 255, 255, 255]).unwrap();
        let options = AsciiOptions { columns: u32::MAX, color: ColorMode::Plain };
        assert_eq!(grid_size(1, 1, u32::MAX), (1, 1));
        assert_eq!(render(&img, &options).unwrap(), " ");
    }

    #[test]
    fn zero_columns_is_range_error() {
        let img = Raster::filled(3, 3, [0, 0, 0, 255]).unwrap();
        let options = AsciiOptions { columns: 0, color: ColorMode::Plain };
        assert!(matches!(render(&img, &options), Err(RetouchError::Range(_))));
    }

    #[test]
    fn timed_result_carries_text() {
        let img = Raster::filled(8, 8, [255, 255, 255, 255]).unwrap();
        let result = render_result(&img, &AsciiOptions { columns: 8, color: ColorMode::Plain }).unwrap();
        assert_eq!(result.tool_id, "ascii");
        assert_eq!(result.text(), Some("        \n        \n        \n        "));
    }
}
