// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Retouch edit engine.

use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetouchError};

/// Supported encoded image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl RasterFormat {
    /// Every supported format, in the order offered to users.
    pub const ALL: [RasterFormat; 6] = [
        Self::Png,
        Self::Jpeg,
        Self::WebP,
        Self::Gif,
        Self::Bmp,
        Self::Tiff,
    ];

    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    /// Parse a declared MIME type. Parameters (`; charset=...`) and case are
    /// ignored, and the common non-standard aliases are accepted.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" | "image/x-png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/tiff" | "image/tif" | "image/x-tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Preferred file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "bmp" | "dib" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether the encoder honours a quality setting.
    ///
    /// The WebP encoder in `image` 0.25 is lossless-only, so only JPEG
    /// qualifies.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// The matching `image` crate format.
    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    /// Map an `image` crate format back, if it is one we support.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }
}

impl std::fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A decoded image: a row-major RGBA8 sample grid plus the format tag and
/// encoded size of the source it came from.
///
/// The sample buffer always holds exactly `width * height * 4` bytes and both
/// dimensions are non-zero; every constructor enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pixels: RgbaImage,
    format: RasterFormat,
    byte_size: usize,
}

impl Raster {
    // -- Construction ---------------------------------------------------------

    /// Wrap a decoded buffer. `byte_size` is the length of the encoded source.
    pub fn from_rgba(pixels: RgbaImage, format: RasterFormat, byte_size: usize) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(RetouchError::ContextUnavailable(format!(
                "cannot hold a {width}x{height} surface"
            )));
        }
        Ok(Self {
            pixels,
            format,
            byte_size,
        })
    }

    /// Build a raster from raw RGBA samples.
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        check_surface(width, height)?;
        let len = samples.len();
        let mismatch = || {
            RetouchError::ContextUnavailable(format!(
                "{len} samples do not fill a {width}x{height} RGBA surface"
            ))
        };
        // `from_raw` accepts oversized buffers; the sample count must be exact.
        if len != width as usize * height as usize * 4 {
            return Err(mismatch());
        }
        let pixels = RgbaImage::from_raw(width, height, samples).ok_or_else(mismatch)?;
        Self::from_rgba(pixels, RasterFormat::Png, 0)
    }

    /// Allocate a raster filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        check_surface(width, height)?;
        Self::from_rgba(RgbaImage::from_pixel(width, height, Rgba(rgba)), RasterFormat::Png, 0)
    }

    /// Wrap a buffer derived from this raster, possibly with new dimensions.
    /// The format tag carries over; the encoded size does not.
    pub fn derive(&self, pixels: RgbaImage) -> Result<Self> {
        Self::from_rgba(pixels, self.format, 0)
    }

    /// Wrap a same-sized buffer derived from this raster.
    pub fn with_pixels(&self, pixels: RgbaImage) -> Self {
        debug_assert_eq!(pixels.dimensions(), self.pixels.dimensions());
        Self {
            pixels,
            format: self.format,
            byte_size: 0,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Format of the source this raster was decoded from (or derived from).
    pub fn format(&self) -> RasterFormat {
        self.format
    }

    /// Encoded size of the source in bytes; 0 for rasters produced in memory.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Row-major RGBA8 samples.
    pub fn samples(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Borrow the underlying buffer.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the raster and return the underlying buffer.
    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }
}

/// Ensure a `width x height` RGBA surface can be allocated.
pub fn check_surface(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RetouchError::ContextUnavailable(format!(
            "cannot allocate a {width}x{height} surface"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .filter(|n| *n <= isize::MAX as usize)
        .map(|_| ())
        .ok_or_else(|| {
            RetouchError::ContextUnavailable(format!(
                "a {width}x{height} surface exceeds addressable memory"
            ))
        })
}

/// What a filter produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutput {
    Raster(Raster),
    /// UTF-8 text payload (ASCII-art rendering).
    Text(String),
}

/// Output of a single filter run plus timing metadata. Owned by the caller
/// until it is committed to the history.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    pub output: FilterOutput,
    /// Stable identifier of the tool that produced it.
    pub tool_id: String,
    /// Wall-clock time spent in the pixel loop.
    pub elapsed: Duration,
}

impl FilterResult {
    /// The produced raster, if this was an image filter.
    pub fn into_raster(self) -> Option<Raster> {
        match self.output {
            FilterOutput::Raster(raster) => Some(raster),
            FilterOutput::Text(_) => None,
        }
    }

    /// The produced text, if this was the ASCII renderer.
    pub fn text(&self) -> Option<&str> {
        match &self.output {
            FilterOutput::Text(text) => Some(text),
            FilterOutput::Raster(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_aliases_resolve() {
        assert_eq!(RasterFormat::from_mime("image/jpg"), Some(RasterFormat::Jpeg));
        assert_eq!(RasterFormat::from_mime("IMAGE/PNG"), Some(RasterFormat::Png));
        assert_eq!(
            RasterFormat::from_mime("image/x-ms-bmp"),
            Some(RasterFormat::Bmp)
        );
        assert_eq!(
            RasterFormat::from_mime("image/webp; q=0.9"),
            Some(RasterFormat::WebP)
        );
        assert_eq!(RasterFormat::from_mime("application/pdf"), None);
    }

    #[test]
    fn every_format_round_trips_through_mime_and_extension() {
        for format in RasterFormat::ALL {
            assert_eq!(RasterFormat::from_mime(format.mime_type()), Some(format));
            assert_eq!(RasterFormat::from_extension(format.extension()), Some(format));
            assert_eq!(
                RasterFormat::from_image_format(format.image_format()),
                Some(format)
            );
        }
    }

    #[test]
    fn only_jpeg_is_lossy() {
        let lossy: Vec<_> = RasterFormat::ALL.iter().filter(|f| f.is_lossy()).collect();
        assert_eq!(lossy, vec![&RasterFormat::Jpeg]);
    }

    #[test]
    fn sample_count_must_match_dimensions() {
        assert!(Raster::from_samples(2, 2, vec![0; 16]).is_ok());
        let err = Raster::from_samples(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, RetouchError::ContextUnavailable(_)));
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            Raster::filled(0, 10, [0, 0, 0, 255]),
            Err(RetouchError::ContextUnavailable(_))
        ));
        assert!(matches!(
            Raster::from_samples(0, 0, Vec::new()),
            Err(RetouchError::ContextUnavailable(_))
        ));
    }

    #[test]
    fn samples_are_row_major_rgba() {
        let raster = Raster::from_samples(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(raster.pixel(1, 0), [5, 6, 7, 8]);
        assert_eq!(raster.samples().len(), 2 * 1 * 4);
    }

    #[test]
    fn derived_raster_keeps_format_but_not_size() {
        let source = Raster::from_rgba(RgbaImage::new(3, 3), RasterFormat::Jpeg, 1234).unwrap();
        let derived = source.derive(RgbaImage::new(5, 2)).unwrap();
        assert_eq!(derived.format(), RasterFormat::Jpeg);
        assert_eq!(derived.byte_size(), 0);
        assert_eq!(derived.dimensions(), (5, 2));
    }
}
