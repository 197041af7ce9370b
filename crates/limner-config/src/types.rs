//! Enumerations shared by configuration and the service APIs

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the image services are reached
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Call Gemini (planning) and kie.ai (images) directly with user keys
    #[default]
    Direct,
    /// Go through a Limner proxy with a bearer token
    Proxy,
}

/// Visual style preset for generated images
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    /// Data-driven infographic
    #[default]
    Infographic,
    /// Conceptual diagram
    Diagram,
    /// Summary card
    Card,
    /// Hand-drawn whiteboard sketch
    Whiteboard,
    /// Presentation slide
    Slide,
}

impl ImageStyle {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Infographic => "infographic",
            ImageStyle::Diagram => "diagram",
            ImageStyle::Card => "card",
            ImageStyle::Whiteboard => "whiteboard",
            ImageStyle::Slide => "slide",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output aspect ratio
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AspectRatio {
    /// 16:9 landscape
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    /// 4:3 landscape
    #[serde(rename = "4:3")]
    Standard,
    /// 1:1 square
    #[serde(rename = "1:1")]
    Square,
    /// 9:16 portrait
    #[serde(rename = "9:16")]
    Tall,
    /// 3:4 portrait
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Standard => "4:3",
            AspectRatio::Square => "1:1",
            AspectRatio::Tall => "9:16",
            AspectRatio::Portrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageResolution {
    /// About 1024px on the long edge
    #[default]
    #[serde(rename = "1K")]
    OneK,
    /// About 2048px on the long edge
    #[serde(rename = "2K")]
    TwoK,
    /// About 4096px on the long edge
    #[serde(rename = "4K")]
    FourK,
}

impl ImageResolution {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageResolution::OneK => "1K",
            ImageResolution::TwoK => "2K",
            ImageResolution::FourK => "4K",
        }
    }
}

/// Encoded image format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG
    #[default]
    Png,
    /// JPEG
    Jpg,
    /// WebP
    Webp,
}

impl OutputFormat {
    /// Wire name, also used as the file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }

    /// File extension for saved artifacts
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

/// Language for titles, captions and prompt text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Japanese
    #[default]
    Ja,
    /// English
    En,
}

impl Language {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }
}
