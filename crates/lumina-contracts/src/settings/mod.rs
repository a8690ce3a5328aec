mod styles;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use styles::{resolve_style, style_presets, StylePreset, NO_STYLE_ID};

/// Highest tier the upstream image API accepts natively.
pub const MAX_API_RESOLUTION: ImageResolution = ImageResolution::Res4K;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSettingError {
    #[error("unknown aspect ratio '{0}' (expected one of 1:1, 3:4, 4:3, 9:16, 16:9)")]
    AspectRatio(String),
    #[error("unknown resolution '{0}' (expected one of 1K, 2K, 4K, 8K)")]
    Resolution(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    WidePortrait,
    #[serde(rename = "16:9")]
    WideLandscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::WidePortrait,
        AspectRatio::WideLandscape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::WidePortrait => "9:16",
            AspectRatio::WideLandscape => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ParseSettingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
            .ok_or_else(|| ParseSettingError::AspectRatio(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum ImageResolution {
    #[serde(rename = "1K")]
    Res1K,
    #[serde(rename = "2K")]
    Res2K,
    #[default]
    #[serde(rename = "4K")]
    Res4K,
    #[serde(rename = "8K")]
    Res8K,
}

impl ImageResolution {
    pub const ALL: [ImageResolution; 4] = [
        ImageResolution::Res1K,
        ImageResolution::Res2K,
        ImageResolution::Res4K,
        ImageResolution::Res8K,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageResolution::Res1K => "1K",
            ImageResolution::Res2K => "2K",
            ImageResolution::Res4K => "4K",
            ImageResolution::Res8K => "8K",
        }
    }

    /// Tier actually sent upstream, and whether it was lowered from `self`.
    ///
    /// Tiers above [`MAX_API_RESOLUTION`] are marketed but not accepted by the
    /// API; they are requested as the highest supported tier instead and the
    /// caller compensates in the prompt.
    pub fn api_tier(self) -> (ImageResolution, bool) {
        if self > MAX_API_RESOLUTION {
            (MAX_API_RESOLUTION, true)
        } else {
            (self, false)
        }
    }
}

impl fmt::Display for ImageResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageResolution {
    type Err = ParseSettingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| ParseSettingError::Resolution(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub aspect_ratio: AspectRatio,
    pub resolution: ImageResolution,
    pub style: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            resolution: ImageResolution::default(),
            style: NO_STYLE_ID.to_string(),
        }
    }
}

impl GenerationSettings {
    pub fn style_preset(&self) -> &'static StylePreset {
        resolve_style(&self.style)
    }
}
