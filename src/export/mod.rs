//! Export of the composited canvas: single page as PNG/JPG/PDF, or every
//! selected page of a paginated document as one PDF.

pub mod encode;
pub mod sink;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use image::Rgba;
use serde::Deserialize;
use tracing::{debug, info};

use crate::canvas::CompositionCanvas;
use crate::config::settings::Settings;
use crate::error::DocSignError;
use crate::pdf::writer::PdfAssembler;
use crate::sync::PageRangeSelection;

pub use sink::{ArtifactSink, DirectorySink, MemorySink};

/// Base of every exported file name.
pub const FILENAME_BASE: &str = "signed-document";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DocSignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(DocSignError::config(format!(
                "unknown export format '{other}' (expected png, jpg or pdf)"
            ))),
        }
    }
}

/// An encoded export, ready to be handed to an [`ArtifactSink`].
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Pages in the artifact (1 for raster formats).
    pub page_count: u32,
}

/// `signed-document-page-{n}.{ext}`
pub fn current_page_filename(page_index: u32, format: ExportFormat) -> String {
    format!("{FILENAME_BASE}-page-{page_index}.{}", format.extension())
}

/// Name of a multi-page export for `selection`.
pub fn all_pages_filename(selection: &PageRangeSelection) -> String {
    if selection.is_subset_export() {
        format!("{FILENAME_BASE}-selected-pages.pdf")
    } else {
        format!("{FILENAME_BASE}-all-pages.pdf")
    }
}

/// PDF page size in millimetres for a `width_px x height_px` raster: the
/// width is fixed and the height keeps the pixel aspect ratio.
pub fn page_size_mm(width_px: u32, height_px: u32, width_mm: f32) -> (f32, f32) {
    (width_mm, height_px as f32 * width_mm / width_px as f32)
}

/// Cooperative cancellation for [`ExportPipeline::export_all_pages`].
///
/// Checked before each page; clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Rc<Cell<bool>>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Page navigation as seen by the multi-page export.
pub trait PageNavigator {
    fn is_paginated(&self) -> bool;

    fn page_count(&self) -> u32;

    /// Show `page_index` on the canvas: new background plus any initials
    /// due on that page.
    fn show_page(&mut self, page_index: u32) -> LocalBoxFuture<'_, crate::error::Result<()>>;

    fn canvas(&self) -> &CompositionCanvas;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Output multiplier for PNG/JPG exports.
    pub multiplier: f32,
    pub jpeg_quality: u8,
    /// PDF page width; heights follow each page's aspect ratio.
    pub pdf_width_mm: f32,
    /// Wait between showing a page and rasterizing it.
    pub settle_delay: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            jpeg_quality: 90,
            pdf_width_mm: 210.0,
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl From<&Settings> for ExportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            multiplier: settings.export_multiplier,
            jpeg_quality: settings.jpeg_quality,
            pdf_width_mm: settings.pdf_width_mm,
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportPipeline {
    options: ExportOptions,
}

impl ExportPipeline {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export what the canvas currently shows.
    ///
    /// PNG and JPG are rendered at the output multiplier over white. PDF
    /// wraps a JPEG of the canvas at its own size into one page whose height
    /// follows the canvas aspect ratio.
    pub fn export_current_page(
        &self,
        canvas: &CompositionCanvas,
        page_index: u32,
        format: ExportFormat,
    ) -> crate::error::Result<ExportArtifact> {
        if !canvas.is_initialized() {
            return Err(DocSignError::not_applicable("no page is shown on the canvas"));
        }

        let bytes = match format {
            ExportFormat::Png => {
                encode::encode_png(&canvas.rasterize(self.options.multiplier, Some(WHITE))?)?
            }
            ExportFormat::Jpg => encode::encode_jpeg(
                &canvas.rasterize(self.options.multiplier, Some(WHITE))?,
                self.options.jpeg_quality,
            )?,
            ExportFormat::Pdf => {
                let raster = canvas.rasterize(1.0, Some(WHITE))?;
                let (width_mm, height_mm) =
                    page_size_mm(raster.width(), raster.height(), self.options.pdf_width_mm);
                let mut pdf = PdfAssembler::new();
                pdf.add_image_page(
                    &encode::jpeg_page_image(&raster, self.options.jpeg_quality)?,
                    width_mm,
                    height_mm,
                )?;
                pdf.finish()?
            }
        };

        let filename = current_page_filename(page_index, format);
        info!(%filename, bytes = bytes.len(), "current page exported");
        Ok(ExportArtifact {
            filename,
            format,
            bytes,
            page_count: 1,
        })
    }

    /// Export the pages of `selection` (ascending) as one PDF.
    ///
    /// Each page is shown through `navigator`, left to settle, rasterized at
    /// canvas size and appended at its own aspect ratio. Restoring the page
    /// that was shown before is the caller's job.
    pub async fn export_all_pages<N>(
        &self,
        navigator: &mut N,
        selection: &PageRangeSelection,
        cancel: &CancelFlag,
    ) -> crate::error::Result<ExportArtifact>
    where
        N: PageNavigator + ?Sized,
    {
        if !navigator.is_paginated() {
            return Err(DocSignError::not_applicable(
                "multi-page export needs a paginated document",
            ));
        }

        let pages = selection.export_pages(navigator.page_count());
        info!(pages = ?pages, "exporting pages");

        let mut pdf = PdfAssembler::new();
        for &page in &pages {
            if cancel.is_cancelled() {
                info!(page, "export cancelled");
                return Err(DocSignError::Cancelled);
            }

            navigator.show_page(page).await?;
            if !self.options.settle_delay.is_zero() {
                tokio::time::sleep(self.options.settle_delay).await;
            }

            let raster = navigator.canvas().rasterize(1.0, Some(WHITE))?;
            let (width_mm, height_mm) =
                page_size_mm(raster.width(), raster.height(), self.options.pdf_width_mm);
            pdf.add_image_page(&encode::flate_page_image(&raster)?, width_mm, height_mm)?;
            debug!(page, width_mm, height_mm, "page appended");
        }

        let page_count = pdf.page_count() as u32;
        let bytes = pdf.finish()?;
        let filename = all_pages_filename(selection);
        info!(%filename, page_count, bytes = bytes.len(), "pages exported");
        Ok(ExportArtifact {
            filename,
            format: ExportFormat::Pdf,
            bytes,
            page_count,
        })
    }
}
