//! # Chain Configuration
//!
//! Ambient renderer defaults that filters fall back to when a caller leaves
//! an attribute unspecified, plus where composite shader programs live.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::colorimetry::YuvColorimetric;
use crate::scaler::Scaler;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Renderer-wide defaults, captured by a graph when it is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererDefaults {
    pub colorimetric: YuvColorimetric,
    /// Output limited (16-235) instead of full range
    pub output_limited_range: bool,
    /// Clamp chroma to the legal range when converting to RGB
    pub limit_chroma: bool,
    pub luma_upscaler: Scaler,
    pub luma_downscaler: Scaler,
}

impl Default for RendererDefaults {
    fn default() -> Self {
        Self {
            colorimetric: YuvColorimetric::Bt709,
            output_limited_range: false,
            limit_chroma: true,
            luma_upscaler: Scaler::Lanczos {
                taps: 3,
                anti_ringing: true,
            },
            luma_downscaler: Scaler::Bicubic { sharpness: 0.5 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub defaults: RendererDefaults,
    /// Directory relative program file names are resolved against
    pub shader_dir: PathBuf,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            defaults: RendererDefaults::default(),
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl ChainConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_json()?).map_err(io_error)
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("renderchain");
        path.push("config.json");
        path
    }
}
