// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::RasterFormat;

/// Tunable engine settings. Missing keys in a config file fall back to the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Format used when exporting without an explicit choice.
    pub default_export_format: RasterFormat,
    /// Quality for lossy exports (1-100).
    pub default_quality: u8,
    /// Largest encoded upload accepted by callers, in bytes.
    pub max_upload_bytes: usize,
    /// RGB distance at or below which a pixel counts as background.
    pub segmentation_threshold: f32,
    /// Width of the alpha ramp above the threshold.
    pub segmentation_feather: f32,
    /// Default character columns for ASCII rendering.
    pub ascii_columns: u32,
    /// Gaussian sigma used by the sketch filter.
    pub sketch_sigma: f32,
    /// Maximum per-channel jitter applied by the watercolor filter.
    pub watercolor_jitter: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_export_format: RasterFormat::Png,
            default_quality: 92,
            max_upload_bytes: 50 * 1024 * 1024,
            segmentation_threshold: 30.0,
            segmentation_feather: 20.0,
            ascii_columns: 80,
            sketch_sigma: 2.0,
            watercolor_jitter: 10,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), "engine config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
