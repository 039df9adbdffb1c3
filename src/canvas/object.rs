// Placed marks: identity, transform, hit geometry

use std::sync::Arc;

use image::RgbaImage;

use crate::mark::MarkKind;

/// Identity of an object on the canvas. Unique for the canvas lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

/// Identity of an initial placement lineage, shared by all its reproductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub(crate) u64);

/// Position, scale and rotation of a placed mark.
///
/// The image's top-left corner sits at (`left`, `top`); the local to canvas
/// mapping is `translate(left, top) * rotate(angle) * scale(scale_x, scale_y)`
/// with `angle` in degrees, clockwise in canvas space (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub left: f32,
    pub top: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub angle: f32,
}

impl Transform {
    pub fn new(left: f32, top: f32, scale: f32) -> Self {
        Self {
            left,
            top,
            scale_x: scale,
            scale_y: scale,
            angle: 0.0,
        }
    }

    /// Map a canvas point into the object's local pixel space.
    ///
    /// Returns `None` when the scale is degenerate.
    pub fn to_local(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        if self.scale_x.abs() < f32::EPSILON || self.scale_y.abs() < f32::EPSILON {
            return None;
        }
        let (dx, dy) = (x - self.left, y - self.top);
        let (sin, cos) = self.angle.to_radians().sin_cos();
        // inverse rotation
        let rx = dx * cos + dy * sin;
        let ry = -dx * sin + dy * cos;
        Some((rx / self.scale_x, ry / self.scale_y))
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_translate(self.left, self.top)
            .pre_concat(tiny_skia::Transform::from_rotate(self.angle))
            .pre_concat(tiny_skia::Transform::from_scale(self.scale_x, self.scale_y))
    }
}

/// A mark placed on the composition canvas.
#[derive(Debug, Clone)]
pub struct AnnotationObject {
    pub(crate) id: ObjectId,
    pub(crate) kind: MarkKind,
    pub(crate) image: Arc<RgbaImage>,
    pub(crate) transform: Transform,
    pub(crate) mark_id: Option<MarkId>,
}

impl AnnotationObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Sync identity; `Some` only for initials.
    pub fn mark_id(&self) -> Option<MarkId> {
        self.mark_id
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn shared_image(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.image)
    }

    /// Whether the canvas point lies inside the transformed image bounds.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let Some((u, v)) = self.transform.to_local(x, y) else {
            return false;
        };
        u >= 0.0 && v >= 0.0 && u < self.image.width() as f32 && v < self.image.height() as f32
    }
}
