// pdfium-render backend: PDF page -> RgbaImage (in-memory only)

use futures::future::LocalBoxFuture;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;

use super::PageBackend;
use crate::cache::hash::fingerprint_bytes;
use crate::error::DocSignError;
use crate::pdf::reader::PdfReader;

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(DocSignError::render(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(DocSignError::render(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Creates a new Pdfium instance by dynamically loading the shared library.
fn create_pdfium() -> crate::error::Result<Pdfium> {
    let lib_path = resolve_pdfium_lib_path()?;
    let lib_path_str = lib_path
        .to_str()
        .ok_or_else(|| DocSignError::render("pdfium library path contains non-UTF-8 characters"))?;
    let bindings =
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))
            .map_err(|e| DocSignError::render(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// Renders a page of an in-memory PDF at `scale` pixels per point.
///
/// At scale 1 one PDF point maps to one pixel, so a Letter page
/// (612x792 pt) rendered at scale 2 is 1224x1584 pixels.
///
/// # Arguments
/// * `pdf_bytes`  - Complete PDF file contents
/// * `page_index` - 1-based page number
/// * `scale`      - Pixels per point
pub fn render_pdf_page(
    pdf_bytes: &[u8],
    page_index: u32,
    scale: f32,
) -> crate::error::Result<RgbaImage> {
    let pdfium = create_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| DocSignError::unsupported_document(e.to_string()))?;

    let page_index_u16 = page_index
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| DocSignError::render("page index exceeds u16 range"))?;

    let page = document
        .pages()
        .get(page_index_u16)
        .map_err(|e| DocSignError::render(e.to_string()))?;

    let width_px = (page.width().value * scale).round() as i32;
    let height_px = (page.height().value * scale).round() as i32;

    let config = PdfRenderConfig::new()
        .set_target_width(width_px)
        .set_target_height(height_px);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| DocSignError::render(e.to_string()))?;

    Ok(bitmap.as_image().to_rgba8())
}

/// Paginated backend for PDF files.
///
/// The page count and every page's MediaBox are read with lopdf at load
/// time so that an undecodable file is rejected before any rendering happens.
pub struct PdfiumBackend {
    bytes: Vec<u8>,
    page_count: u32,
}

impl PdfiumBackend {
    pub fn from_bytes(bytes: Vec<u8>) -> crate::error::Result<Self> {
        let reader = PdfReader::from_bytes(&bytes)
            .map_err(|e| DocSignError::unsupported_document(e.to_string()))?;
        let page_count = reader.page_count();
        if page_count == 0 {
            return Err(DocSignError::unsupported_document("PDF has no pages"));
        }
        for page in 1..=page_count {
            reader.page_dimensions(page).map_err(|e| {
                DocSignError::unsupported_document(format!("page {page}: {e}"))
            })?;
        }
        Ok(Self { bytes, page_count })
    }
}

impl PageBackend for PdfiumBackend {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn render(
        &self,
        page_index: u32,
        scale: f32,
    ) -> LocalBoxFuture<'_, crate::error::Result<RgbaImage>> {
        Box::pin(async move { render_pdf_page(&self.bytes, page_index, scale) })
    }

    fn fingerprint(&self) -> String {
        fingerprint_bytes(&[&self.bytes])
    }
}
