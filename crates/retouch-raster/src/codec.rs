// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel buffer adapter — the decode/encode boundary between encoded bytes and
// `Raster` sample grids. Holds no state between calls.

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use retouch_core::error::{Result, RetouchError};
use retouch_core::{Raster, RasterFormat};
use tracing::{debug, instrument};

/// Decode `bytes` declared as `mime_type` into an RGBA raster.
///
/// Multi-frame formats (GIF, TIFF) yield their first frame.
#[instrument(skip(bytes), fields(data_len = bytes.len()))]
pub fn decode(bytes: &[u8], mime_type: &str) -> Result<Raster> {
    let format = RasterFormat::from_mime(mime_type)
        .ok_or_else(|| RetouchError::Decode(format!("unsupported MIME type {mime_type:?}")))?;
    let image = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|err| RetouchError::Decode(format!("failed to decode {format}: {err}")))?;
    into_raster(image, format, bytes.len())
}

/// Decode `bytes` whose format is unknown, sniffing it from the magic bytes.
#[instrument(skip(bytes), fields(data_len = bytes.len()))]
pub fn decode_guessed(bytes: &[u8]) -> Result<Raster> {
    let format = image::guess_format(bytes)
        .ok()
        .and_then(RasterFormat::from_image_format)
        .ok_or_else(|| RetouchError::Decode("unrecognised image signature".into()))?;
    let image = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|err| RetouchError::Decode(format!("failed to decode {format}: {err}")))?;
    into_raster(image, format, bytes.len())
}

fn into_raster(image: DynamicImage, format: RasterFormat, byte_size: usize) -> Result<Raster> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RetouchError::Decode(format!(
            "{format} image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    debug!(
        width = image.width(),
        height = image.height(),
        %format,
        "Image decoded"
    );
    Raster::from_rgba(image.into_rgba8(), format, byte_size)
}

/// Encode a raster as `format`.
///
/// `quality` is clamped to 1-100 and only used by lossy formats. JPEG has no
/// alpha channel, so it is dropped.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height(), %format))]
pub fn encode(raster: &Raster, format: RasterFormat, quality: u8) -> Result<Vec<u8>> {
    let quality = quality.clamp(1, 100);
    let mut buffer = Vec::new();

    match format {
        RasterFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(raster.as_rgba().clone()).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|err| RetouchError::Encode(format!("JPEG encoding failed: {err}")))?;
        }
        _ => {
            let image = DynamicImage::ImageRgba8(raster.as_rgba().clone());
            let mut cursor = std::io::Cursor::new(&mut buffer);
            image
                .write_to(&mut cursor, format.image_format())
                .map_err(|err| RetouchError::Encode(format!("{format} encoding failed: {err}")))?;
        }
    }

    debug!(bytes = buffer.len(), quality, "Image encoded");
    Ok(buffer)
}
