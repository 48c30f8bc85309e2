// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit operation catalogue.
//
// `EditOp` names every history-producing operation together with its
// settings. Its JSON form (tagged by `"op"`) is what the history stores per
// entry, so a recorded chain can be parsed back and replayed.

use std::str::FromStr;
use std::time::Instant;

use retouch_core::error::{Result, RetouchError};
use retouch_core::{EngineConfig, FilterOutput, FilterResult, Raster};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::filter::adjust::{ColorAdjustments, adjust_colors};
use crate::filter::convolve::{blur, edge_detect, median_denoise, sharpen};
use crate::filter::enhance::auto_enhance;
use crate::filter::segment::{SegmentationOptions, remove_background};
use crate::filter::stylize::{cartoon, oil_paint, sketch, watercolor};
use crate::transform::{crop, flip, resize, rotate};

fn default_true() -> bool {
    true
}

fn default_sigma() -> f32 {
    2.0
}

fn default_jitter() -> u8 {
    10
}

/// One history-producing edit and its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    Rotate {
        degrees: f32,
    },
    Flip {
        #[serde(default)]
        horizontal: bool,
        #[serde(default)]
        vertical: bool,
    },
    Resize {
        #[serde(default)]
        width: u32,
        #[serde(default)]
        height: u32,
        #[serde(default = "default_true")]
        maintain_aspect: bool,
    },
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Adjust(ColorAdjustments),
    Sharpen,
    Blur,
    EdgeDetect,
    Denoise,
    AutoEnhance,
    RemoveBackground(SegmentationOptions),
    Sketch {
        #[serde(default = "default_sigma")]
        sigma: f32,
    },
    Watercolor {
        #[serde(default = "default_jitter")]
        jitter: u8,
    },
    OilPaint,
    Cartoon,
}

impl EditOp {
    /// Stable machine identifier, stored as the history entry's tool id.
    pub fn tool_id(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "rotate",
            Self::Flip { .. } => "flip",
            Self::Resize { .. } => "resize",
            Self::Crop { .. } => "crop",
            Self::Adjust(_) => "adjust",
            Self::Sharpen => "sharpen",
            Self::Blur => "blur",
            Self::EdgeDetect => "edge_detect",
            Self::Denoise => "denoise",
            Self::AutoEnhance => "auto_enhance",
            Self::RemoveBackground(_) => "remove_background",
            Self::Sketch { .. } => "sketch",
            Self::Watercolor { .. } => "watercolor",
            Self::OilPaint => "oil_paint",
            Self::Cartoon => "cartoon",
        }
    }

    /// Display name for history timelines.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "Rotate",
            Self::Flip { .. } => "Flip",
            Self::Resize { .. } => "Resize",
            Self::Crop { .. } => "Crop",
            Self::Adjust(_) => "Adjust Colors",
            Self::Sharpen => "Sharpen",
            Self::Blur => "Blur",
            Self::EdgeDetect => "Edge Detect",
            Self::Denoise => "Denoise",
            Self::AutoEnhance => "Auto Enhance",
            Self::RemoveBackground(_) => "Remove Background",
            Self::Sketch { .. } => "Sketch",
            Self::Watercolor { .. } => "Watercolor",
            Self::OilPaint => "Oil Painting",
            Self::Cartoon => "Cartoon",
        }
    }

    /// Whether two runs on the same input produce identical output.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, Self::Watercolor { jitter } if *jitter > 0)
    }

    /// Build an operation from its bare tool id, taking tunable defaults
    /// (segmentation thresholds, sketch sigma, watercolor jitter) from `config`.
    pub fn from_tool_id(tool_id: &str, config: &EngineConfig) -> Result<Self> {
        let op = match tool_id {
            "remove_background" => Self::RemoveBackground(SegmentationOptions {
                threshold: config.segmentation_threshold,
                feather: config.segmentation_feather,
            }),
            "sketch" => Self::Sketch {
                sigma: config.sketch_sigma,
            },
            "watercolor" => Self::Watercolor {
                jitter: config.watercolor_jitter,
            },
            other => other.parse()?,
        };
        Ok(op)
    }

    /// Settings as the JSON object stored in a history entry.
    pub fn settings(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(RetouchError::Settings(format!(
                "{} serialised to a non-object: {other}",
                self.tool_id()
            ))),
        }
    }

    /// Parse a settings object recorded by [`EditOp::settings`].
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(settings.clone()))
            .map_err(|err| RetouchError::Settings(err.to_string()))
    }

    /// Apply the edit to `raster`, returning a new raster.
    #[instrument(skip(self, raster), fields(tool = self.tool_id()))]
    pub fn apply(&self, raster: &Raster) -> Result<Raster> {
        let output = match self {
            Self::Rotate { degrees } => rotate(raster, *degrees)?,
            Self::Flip {
                horizontal,
                vertical,
            } => flip(raster, *horizontal, *vertical),
            Self::Resize {
                width,
                height,
                maintain_aspect,
            } => resize(raster, *width, *height, *maintain_aspect)?,
            Self::Crop {
                x,
                y,
                width,
                height,
            } => crop(raster, *x, *y, *width, *height)?,
            Self::Adjust(settings) => adjust_colors(raster, settings),
            Self::Sharpen => sharpen(raster),
            Self::Blur => blur(raster),
            Self::EdgeDetect => edge_detect(raster),
            Self::Denoise => median_denoise(raster),
            Self::AutoEnhance => auto_enhance(raster),
            Self::RemoveBackground(options) => remove_background(raster, options),
            Self::Sketch { sigma } => sketch(raster, *sigma),
            Self::Watercolor { jitter } => watercolor(raster, *jitter),
            Self::OilPaint => oil_paint(raster),
            Self::Cartoon => cartoon(raster),
        };
        Ok(output)
    }

    /// [`EditOp::apply`] wrapped in a timed `FilterResult`.
    pub fn run(&self, raster: &Raster) -> Result<FilterResult> {
        let started = Instant::now();
        let output = self.apply(raster)?;
        let elapsed = started.elapsed();
        debug!(tool = self.tool_id(), elapsed_ms = elapsed.as_millis() as u64, "Edit applied");
        Ok(FilterResult {
            output: FilterOutput::Raster(output),
            tool_id: self.tool_id().into(),
            elapsed,
        })
    }
}

/// Parses either a JSON object (`{"op":"rotate","degrees":90}`) or the bare
/// tool id of an operation whose settings all have defaults (`sharpen`).
impl FromStr for EditOp {
    type Err = RetouchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value = if trimmed.starts_with('{') {
            serde_json::from_str(trimmed).map_err(|err| RetouchError::Settings(err.to_string()))?
        } else {
            serde_json::json!({ "op": trimmed })
        };
        serde_json::from_value(value).map_err(|err| RetouchError::Settings(err.to_string()))
    }
}
