use std::path::PathBuf;

use crate::{
    core::OutputSize,
    error::{BoothError, BoothResult},
};

/// The two shipped frame variants: "feed" (4:5 post) and "story" (9:16).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FrameVariant {
    Feed,
    Story,
}

impl FrameVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameVariant::Feed => "feed",
            FrameVariant::Story => "story",
        }
    }
}

impl std::fmt::Display for FrameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named output aspect/resolution/overlay bundle. Immutable per variant.
/// `overlay_path` is relative to the [`crate::OverlayStore`] assets root.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameSpec {
    pub variant: FrameVariant,
    pub output: OutputSize,
    pub overlay_path: PathBuf,
}

impl FrameSpec {
    pub fn feed() -> Self {
        Self {
            variant: FrameVariant::Feed,
            output: OutputSize {
                width: 1080,
                height: 1350,
            },
            overlay_path: PathBuf::from("frame-feed.png"),
        }
    }

    pub fn story() -> Self {
        Self {
            variant: FrameVariant::Story,
            output: OutputSize {
                width: 1080,
                height: 1920,
            },
            overlay_path: PathBuf::from("frame-story.png"),
        }
    }

    pub fn for_variant(variant: FrameVariant) -> Self {
        match variant {
            FrameVariant::Feed => Self::feed(),
            FrameVariant::Story => Self::story(),
        }
    }

    /// Deterministic download name for the exported artifact.
    pub fn download_filename(&self) -> &'static str {
        match self.variant {
            FrameVariant::Feed => "photobooth-post.png",
            FrameVariant::Story => "photobooth-story.png",
        }
    }

    pub fn validate(&self) -> BoothResult<()> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err(BoothError::validation("frame output must be > 0 on both axes"));
        }
        if self.overlay_path.as_os_str().is_empty() {
            return Err(BoothError::validation("frame overlay path must be non-empty"));
        }
        Ok(())
    }
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self::feed()
    }
}

/// Resolution requested from the capture device. The device may deliver a
/// different frame size; the actual size is read back before rasterizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureResolution {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureResolution {
    fn default() -> Self {
        Self {
            width: 2560,
            height: 1440,
        }
    }
}
