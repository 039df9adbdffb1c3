// Export encoders: flattened canvas -> PNG / JPEG / Flate RGB bytes

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::error::DocSignError;
use crate::pdf::writer::PageImage;

/// Lossless PNG of the flattened canvas.
pub fn encode_png(image: &RgbaImage) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_with_encoder(PngEncoder::new(&mut buf))?;
    Ok(buf.into_inner())
}

/// Encode an RGBA raster to JPEG, dropping alpha.
///
/// `quality` is 1-100; the raster should already sit on an opaque fill.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(DocSignError::encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    encode_rgb_to_jpeg(&rgb, quality)
}

fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

/// JPEG page image for a PDF (DCTDecode).
pub fn jpeg_page_image(image: &RgbaImage, quality: u8) -> crate::error::Result<PageImage> {
    Ok(PageImage::Jpeg {
        data: encode_jpeg(image, quality)?,
        width: image.width(),
        height: image.height(),
    })
}

/// zlib-compressed 8-bit RGB samples for a PDF (FlateDecode).
pub fn flate_page_image(image: &RgbaImage) -> crate::error::Result<PageImage> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .map_err(|e| DocSignError::encode(format!("Flate compression failed: {e}")))?;
    let data = encoder
        .finish()
        .map_err(|e| DocSignError::encode(format!("Flate compression failed: {e}")))?;
    Ok(PageImage::Flate {
        data,
        width: image.width(),
        height: image.height(),
    })
}
