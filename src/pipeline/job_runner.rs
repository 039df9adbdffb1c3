// ジョブ単位: 文書読込 -> マーク配置 -> エクスポート -> 出力ディレクトリへ書出し

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::settings::Settings;
use crate::error::DocSignError;
use crate::export::{ArtifactSink, CancelFlag, DirectorySink, ExportFormat};
use crate::mark::MarkKind;
use crate::mark::upload::MAX_MARK_BYTES;
use crate::render::MAX_DOCUMENT_BYTES;
use crate::session::EditorSession;
use crate::sync::PageRangeSelection;

/// Where and how to place one mark.
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    pub image_path: PathBuf,
    /// 1-based page the mark is placed on.
    pub page: u32,
    /// Drag applied after placement, in canvas pixels.
    pub offset: Option<(f32, f32)>,
    /// Absolute uniform scale applied after placement.
    pub scale: Option<f32>,
    /// Absolute rotation in degrees applied after placement.
    pub angle: Option<f32>,
}

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub settings: Settings,
    pub format: ExportFormat,
    /// Export the page range as one PDF instead of the last placement page.
    pub all_pages: bool,
    pub page_range: PageRangeSelection,
    pub signature: Option<PlacementConfig>,
    pub initial: Option<PlacementConfig>,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub pages_exported: u32,
}

/// Read a file, rejecting it before decoding if it exceeds `limit` bytes.
fn read_limited(
    path: &Path,
    limit: usize,
    too_large: impl FnOnce(String) -> DocSignError,
) -> crate::error::Result<Vec<u8>> {
    let len = std::fs::metadata(path)?.len();
    if len > limit as u64 {
        return Err(too_large(format!(
            "{} is {} bytes (limit {} bytes)",
            path.display(),
            len,
            limit
        )));
    }
    Ok(std::fs::read(path)?)
}

/// Navigate to the placement page, load the mark and place it.
async fn place_mark(
    session: &mut EditorSession,
    kind: MarkKind,
    placement: &PlacementConfig,
) -> crate::error::Result<()> {
    let page_count = session.page_count();
    if placement.page < 1 || placement.page > page_count {
        return Err(DocSignError::PageOutOfRange {
            page: placement.page,
            page_count,
        });
    }
    session.go_to_page(placement.page).await?;

    let bytes = read_limited(
        &placement.image_path,
        MAX_MARK_BYTES,
        DocSignError::UnsupportedMarkFormat,
    )?;
    session.upload_mark(&bytes, kind).await?;
    match kind {
        MarkKind::Signature => session.add_signature()?,
        MarkKind::Initial => session.add_initial()?,
    };

    if let Some((dx, dy)) = placement.offset {
        session.drag_selected(dx, dy);
    }
    if let Some(scale) = placement.scale {
        session.scale_selected(scale, scale);
    }
    if let Some(angle) = placement.angle {
        session.rotate_selected(angle);
    }
    info!(%kind, page = placement.page, "mark placed");
    Ok(())
}

/// Run a single job through one editor session.
///
/// Initials are placed before the signature so that the signature's page
/// already carries its reproduced initials. Without `all_pages`, the page
/// showing the last placed mark is exported.
///
/// # Errors
/// `ConfigError` if a signature is combined with `all_pages`: the batch
/// export re-renders every page, and signatures are page-local.
pub async fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    if config.all_pages && config.signature.is_some() {
        return Err(DocSignError::config(
            "signature cannot be combined with all_pages; signatures are kept on their page only",
        ));
    }
    let bytes = read_limited(
        &config.input_path,
        MAX_DOCUMENT_BYTES,
        DocSignError::UnsupportedDocumentFormat,
    )?;

    let mut session = EditorSession::new(config.settings.clone())?;
    session.load_document_bytes(bytes)?;
    session.open_editor().await?;
    session.set_format(config.format);
    session.set_page_range(config.page_range.clone());

    if let Some(initial) = &config.initial {
        place_mark(&mut session, MarkKind::Initial, initial).await?;
    }
    if let Some(signature) = &config.signature {
        place_mark(&mut session, MarkKind::Signature, signature).await?;
    }

    let artifact = if config.all_pages {
        session.export_selected_pages(&CancelFlag::new()).await?
    } else {
        session.export_current_page()?
    };
    let pages_exported = artifact.page_count;

    let mut sink = DirectorySink::new(&config.output_dir);
    let output_path = sink.deliver(artifact)?;

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path,
        pages_exported,
    })
}
