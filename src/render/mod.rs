//! Page rasterization: source document page -> [`PageBitmap`].
//!
//! A [`SourceDocument`] is either a single raster image or a paginated
//! document whose pages are produced by an asynchronous [`PageBackend`].

#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod sequence;

use std::fmt;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

use crate::cache::PageCache;
use crate::cache::hash::{compute_page_key, fingerprint_bytes};
use crate::error::DocSignError;

/// Render scale used for paginated sources unless configured otherwise.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Largest accepted document file. Enforced by callers before loading.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// A rendered raster of one page. Never mutated once created.
#[derive(Debug, Clone)]
pub struct PageBitmap {
    image: Arc<RgbaImage>,
    scale: f32,
    page_index: u32,
}

impl PageBitmap {
    pub fn new(image: impl Into<Arc<RgbaImage>>, scale: f32, page_index: u32) -> Self {
        Self {
            image: image.into(),
            scale,
            page_index,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// 1-based source page index (always 1 for plain images).
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn shared_image(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.image)
    }
}

/// Asynchronous page renderer behind a paginated document.
///
/// Execution is single-threaded and cooperative, so the returned futures are
/// not required to be `Send`.
pub trait PageBackend {
    /// Number of pages (at least 1).
    fn page_count(&self) -> u32;

    /// Render 1-based page `page_index` at `scale`.
    ///
    /// Callers guarantee `1 <= page_index <= page_count()`.
    fn render(&self, page_index: u32, scale: f32) -> LocalBoxFuture<'_, crate::error::Result<RgbaImage>>;

    /// Stable identity of the rendered content, used in page cache keys.
    fn fingerprint(&self) -> String;
}

enum SourceKind {
    Image(Arc<RgbaImage>),
    Paginated(Box<dyn PageBackend>),
}

/// A loaded document. Immutable; replaced wholesale when a new file is chosen.
pub struct SourceDocument {
    kind: SourceKind,
    fingerprint: String,
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("paginated", &self.is_paginated())
            .field("page_count", &self.page_count())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl SourceDocument {
    /// Wrap a decoded raster image as a single-page source.
    pub fn from_image(image: DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let fingerprint = fingerprint_bytes(&[
            &rgba.width().to_le_bytes(),
            &rgba.height().to_le_bytes(),
            rgba.as_raw(),
        ]);
        Self {
            kind: SourceKind::Image(Arc::new(rgba)),
            fingerprint,
        }
    }

    /// Wrap a paginated backend.
    pub fn paginated(backend: impl PageBackend + 'static) -> Self {
        let fingerprint = backend.fingerprint();
        Self {
            kind: SourceKind::Paginated(Box::new(backend)),
            fingerprint,
        }
    }

    /// Decode a document file by content sniffing.
    ///
    /// PDF (`%PDF` magic) becomes a paginated source; PNG and JPEG become
    /// image sources. Anything else is `UnsupportedDocumentFormat`.
    pub fn from_bytes(bytes: Vec<u8>) -> crate::error::Result<Self> {
        if bytes.starts_with(b"%PDF") {
            return Self::from_pdf_bytes(bytes);
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| DocSignError::unsupported_document(e.to_string()))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(DocSignError::unsupported_document(format!(
                "expected PNG, JPEG or PDF, got {format:?}"
            )));
        }
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| DocSignError::unsupported_document(e.to_string()))?;
        Ok(Self::from_image(image))
    }

    #[cfg(feature = "pdfium")]
    fn from_pdf_bytes(bytes: Vec<u8>) -> crate::error::Result<Self> {
        Ok(Self::paginated(pdfium::PdfiumBackend::from_bytes(bytes)?))
    }

    #[cfg(not(feature = "pdfium"))]
    fn from_pdf_bytes(_bytes: Vec<u8>) -> crate::error::Result<Self> {
        Err(DocSignError::unsupported_document(
            "PDF rendering requires the `pdfium` feature",
        ))
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self.kind, SourceKind::Paginated(_))
    }

    pub fn page_count(&self) -> u32 {
        match &self.kind {
            SourceKind::Image(_) => 1,
            SourceKind::Paginated(backend) => backend.page_count(),
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn validate_scale(scale: f32) -> crate::error::Result<()> {
    if scale.is_finite() && scale >= 1.0 {
        Ok(())
    } else {
        Err(DocSignError::render(format!(
            "render scale must be >= 1, got {scale}"
        )))
    }
}

/// Render one page of `document`.
///
/// Image sources only have page 1 and are returned verbatim (scale 1).
/// Paginated sources are rendered by their backend at `scale`.
///
/// # Errors
/// - `InvalidPageIndex` if `page_index` is outside `1..=page_count`
/// - `RenderError` if `scale` is below 1 or the backend fails
pub async fn render_page(
    document: &SourceDocument,
    page_index: u32,
    scale: f32,
) -> crate::error::Result<PageBitmap> {
    let page_count = document.page_count();
    if page_index < 1 || page_index > page_count {
        return Err(DocSignError::InvalidPageIndex {
            page: page_index,
            page_count,
        });
    }

    match &document.kind {
        SourceKind::Image(image) => Ok(PageBitmap::new(Arc::clone(image), 1.0, 1)),
        SourceKind::Paginated(backend) => {
            validate_scale(scale)?;
            let image = backend.render(page_index, scale).await?;
            debug!(
                page = page_index,
                scale,
                width = image.width(),
                height = image.height(),
                "rendered page"
            );
            Ok(PageBitmap::new(image, scale, page_index))
        }
    }
}

/// Renders pages at a fixed scale, caching bitmaps per page.
pub struct PageRasterizer {
    scale: f32,
    cache: PageCache,
}

impl PageRasterizer {
    pub fn new(scale: f32, cache_capacity: usize) -> Self {
        Self {
            scale,
            cache: PageCache::new(cache_capacity),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Render `page_index`, serving repeated requests from the cache.
    ///
    /// The cache key includes the document fingerprint and the scale, so a
    /// hit always matches the current scale.
    pub async fn render(
        &mut self,
        document: &SourceDocument,
        page_index: u32,
    ) -> crate::error::Result<PageBitmap> {
        if !document.is_paginated() {
            return render_page(document, page_index, self.scale).await;
        }

        let key = compute_page_key(document.fingerprint(), page_index, self.scale);
        if let Some(bitmap) = self.cache.get(&key) {
            debug!(page = page_index, "page cache hit");
            return Ok(bitmap);
        }

        let bitmap = render_page(document, page_index, self.scale).await?;
        self.cache.insert(key, bitmap.clone());
        Ok(bitmap)
    }

    /// Drop every cached page (called when the document changes).
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }
}

/// Downscale a page for on-screen preview, preserving aspect ratio.
///
/// Pages wider than `max_width` are scaled to that width; if the result is
/// still taller than `max_height`, it is scaled to that height instead.
/// Never used on the export path.
pub fn fit_to_preview(bitmap: &PageBitmap, max_width: u32, max_height: u32) -> RgbaImage {
    let (width, height) = (bitmap.width() as f32, bitmap.height() as f32);
    let mut scale = 1.0_f32;
    if width > max_width as f32 {
        scale = max_width as f32 / width;
    }
    if height * scale > max_height as f32 {
        scale = max_height as f32 / height;
    }

    if scale >= 1.0 {
        return bitmap.image().clone();
    }

    let target_w = ((width * scale).round() as u32).max(1);
    let target_h = ((height * scale).round() as u32).max(1);
    image::imageops::resize(
        bitmap.image(),
        target_w,
        target_h,
        image::imageops::FilterType::Triangle,
    )
}
