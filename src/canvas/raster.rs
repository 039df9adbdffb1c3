// Canvas flattening: background + placed marks -> RgbaImage (tiny-skia)

use image::{Rgba, RgbaImage};
use tiny_skia::{Color, ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use super::object::AnnotationObject;
use crate::error::DocSignError;
use crate::render::PageBitmap;

/// Convert a premultiplied pixmap into a straight-alpha RGBA image.
pub fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image
}

/// Convert a straight-alpha RGBA image into a premultiplied pixmap.
pub fn image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn paint() -> PixmapPaint {
    PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    }
}

/// Composite `background` and `objects` (in stacking order) at `multiplier`.
///
/// The output is `round(w * multiplier) x round(h * multiplier)` pixels.
/// `fill` paints the area under the background first (white for exports).
pub fn flatten(
    background: &PageBitmap,
    objects: &[AnnotationObject],
    multiplier: f32,
    fill: Option<Rgba<u8>>,
) -> crate::error::Result<RgbaImage> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(DocSignError::render(format!(
            "output multiplier must be > 0, got {multiplier}"
        )));
    }

    let width = ((background.width() as f32 * multiplier).round() as u32).max(1);
    let height = ((background.height() as f32 * multiplier).round() as u32).max(1);
    let mut canvas = Pixmap::new(width, height).ok_or_else(|| {
        DocSignError::render(format!("canvas too large to rasterize: {width}x{height}"))
    })?;

    if let Some(Rgba([r, g, b, a])) = fill {
        canvas.fill(Color::from_rgba8(r, g, b, a));
    }

    let scale = Transform::from_scale(multiplier, multiplier);
    let page = image_to_pixmap(background.image())
        .ok_or_else(|| DocSignError::render("background page has no pixels"))?;
    canvas.draw_pixmap(0, 0, page.as_ref(), &paint(), scale, None);

    for object in objects {
        let Some(mark) = image_to_pixmap(object.image()) else {
            continue;
        };
        let transform = scale.pre_concat(object.transform().to_skia());
        canvas.draw_pixmap(0, 0, mark.as_ref(), &paint(), transform, None);
    }

    Ok(pixmap_to_image(&canvas))
}
