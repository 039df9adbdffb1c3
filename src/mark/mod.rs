//! Signature and initial marks: capture by freehand drawing or upload.

pub mod drawing;
pub mod upload;

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::Deserialize;

/// Logical kind of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Signature,
    Initial,
}

impl MarkKind {
    /// Selection accent color (corners and border) as `#rrggbb`.
    pub fn accent(self) -> &'static str {
        match self {
            MarkKind::Signature => "#4299e1",
            MarkKind::Initial => "#48bb78",
        }
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkKind::Signature => f.write_str("signature"),
            MarkKind::Initial => f.write_str("initial"),
        }
    }
}

/// How the current signature was captured; decides which flow an edit
/// re-enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMethod {
    #[default]
    Draw,
    Upload,
}

/// A transparent-background raster of a signature or initial.
#[derive(Debug, Clone)]
pub struct MarkBitmap {
    image: Arc<RgbaImage>,
    kind: MarkKind,
}

impl MarkBitmap {
    pub fn new(image: impl Into<Arc<RgbaImage>>, kind: MarkKind) -> Self {
        Self {
            image: image.into(),
            kind,
        }
    }

    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub(crate) fn shared_image(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.image)
    }
}
