// Freehand drawing surface: strokes -> transparent MarkBitmap (tiny-skia)

use std::str::FromStr;

use image::RgbaImage;
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{debug, warn};

use super::{MarkBitmap, MarkKind};
use crate::canvas::raster::pixmap_to_image;
use crate::error::DocSignError;

/// Brush color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrokeColor {
    pub const BLACK: StrokeColor = StrokeColor { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional).
    pub fn from_hex(s: &str) -> crate::error::Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || DocSignError::config(format!("invalid stroke color: '{s}'"));
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(invalid)
        };
        match hex.len() {
            6 => Ok(StrokeColor {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
            }),
            3 => Ok(StrokeColor {
                r: channel(0..1)? * 17,
                g: channel(1..2)? * 17,
                b: channel(2..3)? * 17,
            }),
            _ => Err(invalid()),
        }
    }

    fn to_skia(self) -> Color {
        Color::from_rgba8(self.r, self.g, self.b, 255)
    }
}

impl FromStr for StrokeColor {
    type Err = DocSignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[derive(Debug, Clone)]
struct FreehandStroke {
    points: Vec<(f32, f32)>,
    width: f32,
    color: StrokeColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceBackground {
    White,
    Transparent,
}

/// Isolated freehand drawing region for capturing one mark.
///
/// The surface shows a white background while drawing; the background is
/// switched to transparent exactly at [`DrawingSurface::commit`], so the
/// resulting bitmap has no fill.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    kind: MarkKind,
    width: u32,
    height: u32,
    multiplier: f32,
    default_width: f32,
    default_color: StrokeColor,
    stroke_width: f32,
    stroke_color: StrokeColor,
    strokes: Vec<FreehandStroke>,
    active: Option<FreehandStroke>,
    background: SurfaceBackground,
}

impl DrawingSurface {
    /// Create a `width` x `height` surface with a 2 px black brush.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            kind: MarkKind::Signature,
            width: width.max(1),
            height: height.max(1),
            multiplier: 2.0,
            default_width: 2.0,
            default_color: StrokeColor::BLACK,
            stroke_width: 2.0,
            stroke_color: StrokeColor::BLACK,
            strokes: Vec::new(),
            active: None,
            background: SurfaceBackground::White,
        }
    }

    /// Output resolution multiplier applied at commit.
    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.multiplier = multiplier;
        }
        self
    }

    /// Brush used after every [`DrawingSurface::begin`].
    pub fn with_default_brush(mut self, width: f32, color: StrokeColor) -> Self {
        if width.is_finite() && width > 0.0 {
            self.default_width = width;
            self.stroke_width = width;
        }
        self.default_color = color;
        self.stroke_color = color;
        self
    }

    /// Start a fresh capture for `kind`, discarding any strokes.
    pub fn begin(&mut self, kind: MarkKind) {
        self.kind = kind;
        self.stroke_width = self.default_width;
        self.stroke_color = self.default_color;
        self.strokes.clear();
        self.active = None;
        self.background = SurfaceBackground::White;
        debug!(%kind, "drawing surface started");
    }

    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn stroke_color(&self) -> StrokeColor {
        self.stroke_color
    }

    /// Brush width for subsequent strokes. Non-positive widths are ignored.
    pub fn set_stroke_width(&mut self, px: f32) {
        if px.is_finite() && px > 0.0 {
            self.stroke_width = px;
        }
    }

    pub fn set_stroke_color(&mut self, color: StrokeColor) {
        self.stroke_color = color;
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.finish_active();
        self.active = Some(FreehandStroke {
            points: vec![(x, y)],
            width: self.stroke_width,
            color: self.stroke_color,
        });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push((x, y));
        }
    }

    pub fn pointer_up(&mut self) {
        self.finish_active();
    }

    /// Add a complete stroke through `points`.
    pub fn add_stroke(&mut self, points: &[(f32, f32)]) {
        let Some((&(x, y), rest)) = points.split_first() else {
            return;
        };
        self.pointer_down(x, y);
        for &(x, y) in rest {
            self.pointer_move(x, y);
        }
        self.pointer_up();
    }

    fn finish_active(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }

    /// Number of strokes drawn, including one in progress.
    pub fn stroke_count(&self) -> usize {
        self.strokes.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.stroke_count() == 0
    }

    /// Remove every stroke and restore the white background.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
        self.background = SurfaceBackground::White;
    }

    /// On-screen rendering at 1x with the current background.
    pub fn preview(&self) -> Option<RgbaImage> {
        let pixmap = self.rasterize(1.0, self.background == SurfaceBackground::White)?;
        Some(pixmap_to_image(&pixmap))
    }

    /// Rasterize the strokes on a transparent background.
    ///
    /// Returns `None` without touching any state if nothing has been drawn.
    pub fn commit(&mut self) -> Option<MarkBitmap> {
        if self.is_empty() {
            return None;
        }
        self.finish_active();
        self.background = SurfaceBackground::Transparent;

        let Some(pixmap) = self.rasterize(self.multiplier, false) else {
            warn!(
                width = self.width,
                height = self.height,
                multiplier = self.multiplier,
                "drawing surface too large to rasterize"
            );
            return None;
        };
        debug!(kind = %self.kind, strokes = self.strokes.len(), "mark committed");
        Some(MarkBitmap::new(pixmap_to_image(&pixmap), self.kind))
    }

    fn rasterize(&self, multiplier: f32, white_background: bool) -> Option<Pixmap> {
        let width = ((self.width as f32 * multiplier).round() as u32).max(1);
        let height = ((self.height as f32 * multiplier).round() as u32).max(1);
        let mut pixmap = Pixmap::new(width, height)?;
        if white_background {
            pixmap.fill(Color::WHITE);
        }

        let transform = Transform::from_scale(multiplier, multiplier);
        for stroke in self.strokes.iter().chain(self.active.iter()) {
            let mut paint = Paint::default();
            paint.set_color(stroke.color.to_skia());
            paint.anti_alias = true;

            if let [(x, y)] = stroke.points.as_slice() {
                if let Some(dot) = PathBuilder::from_circle(*x, *y, stroke.width / 2.0) {
                    pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
                }
                continue;
            }

            let mut builder = PathBuilder::new();
            let mut points = stroke.points.iter();
            if let Some(&(x, y)) = points.next() {
                builder.move_to(x, y);
            }
            for &(x, y) in points {
                builder.line_to(x, y);
            }
            let Some(path) = builder.finish() else {
                continue;
            };
            let style = Stroke {
                width: stroke.width,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &style, transform, None);
        }

        Some(pixmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hex_expands_channels() {
        let color = StrokeColor::from_hex("#f0a").expect("parse");
        assert_eq!(color, StrokeColor { r: 255, g: 0, b: 170 });
    }

    #[test]
    fn test_invalid_hex_is_rejected() {
        assert!(StrokeColor::from_hex("#12345").is_err());
        assert!(StrokeColor::from_hex("#gggggg").is_err());
    }
}
