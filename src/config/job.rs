use serde::Deserialize;

use crate::export::ExportFormat;
use crate::sync::page_range::PageRangeSelection;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output_dir: String,
    pub format: Option<ExportFormat>,
    /// Export every selected page into one PDF instead of the placement page only.
    #[serde(default)]
    pub all_pages: bool,
    /// Page range expression for initial synchronization (e.g. `"1,3,5-8"`).
    pub pages: Option<String>,
    pub render_scale: Option<f32>,
    pub export_multiplier: Option<f32>,
    pub jpeg_quality: Option<u8>,
    pub settle_delay_ms: Option<u64>,
    pub signature: Option<Placement>,
    pub initial: Option<Placement>,
}

/// 署名・イニシャル画像の配置指定。
#[derive(Debug, Clone, Deserialize)]
pub struct Placement {
    pub image: String,
    #[serde(default = "default_page")]
    pub page: u32,
    /// Drag applied after placement, in canvas pixels.
    pub offset: Option<[f32; 2]>,
    /// Absolute scale applied after placement.
    pub scale: Option<f32>,
    /// Absolute rotation in degrees applied after placement.
    pub angle: Option<f32>,
}

fn default_page() -> u32 {
    1
}

impl Job {
    /// `pages` が未指定なら全ページ、指定があれば寛容にパースした範囲を返す。
    pub fn page_range(&self) -> PageRangeSelection {
        self.pages
            .as_deref()
            .map_or(PageRangeSelection::All, PageRangeSelection::from_text)
    }

    /// Output format, defaulting to PDF.
    pub fn export_format(&self) -> ExportFormat {
        self.format.unwrap_or(ExportFormat::Pdf)
    }
}
