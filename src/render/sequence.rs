// In-memory page sequence backend (scanned pages, one image per page)

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use image::{DynamicImage, RgbaImage, imageops::FilterType};

use super::PageBackend;
use crate::cache::hash::fingerprint_bytes;
use crate::error::DocSignError;

/// A paginated document whose pages are already rasters at scale 1.
///
/// Rendering at scale `s` resizes a page to `round(w * s) x round(h * s)`.
pub struct ImageSequence {
    pages: Vec<Arc<RgbaImage>>,
}

impl ImageSequence {
    pub fn new(pages: Vec<DynamicImage>) -> crate::error::Result<Self> {
        if pages.is_empty() {
            return Err(DocSignError::unsupported_document(
                "page sequence must contain at least one page",
            ));
        }
        Ok(Self {
            pages: pages.into_iter().map(|p| Arc::new(p.to_rgba8())).collect(),
        })
    }

    /// Decode each encoded image as one page.
    pub fn from_encoded(pages: &[Vec<u8>]) -> crate::error::Result<Self> {
        let decoded = pages
            .iter()
            .map(|bytes| {
                image::load_from_memory(bytes)
                    .map_err(|e| DocSignError::unsupported_document(e.to_string()))
            })
            .collect::<crate::error::Result<Vec<_>>>()?;
        Self::new(decoded)
    }
}

impl PageBackend for ImageSequence {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn render(
        &self,
        page_index: u32,
        scale: f32,
    ) -> LocalBoxFuture<'_, crate::error::Result<RgbaImage>> {
        Box::pin(async move {
            let page = page_index
                .checked_sub(1)
                .and_then(|i| self.pages.get(i as usize))
                .ok_or(DocSignError::InvalidPageIndex {
                    page: page_index,
                    page_count: self.page_count(),
                })?;

            if (scale - 1.0).abs() < f32::EPSILON {
                return Ok(page.as_ref().clone());
            }

            let width = ((page.width() as f32 * scale).round() as u32).max(1);
            let height = ((page.height() as f32 * scale).round() as u32).max(1);
            Ok(image::imageops::resize(
                page.as_ref(),
                width,
                height,
                FilterType::Triangle,
            ))
        })
    }

    fn fingerprint(&self) -> String {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(self.pages.len() * 2);
        for page in &self.pages {
            let mut dims = page.width().to_le_bytes().to_vec();
            dims.extend_from_slice(&page.height().to_le_bytes());
            parts.push(dims);
            parts.push(page.as_raw().clone());
        }
        let refs: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
        fingerprint_bytes(&refs)
    }
}
