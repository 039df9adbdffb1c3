//! Editor session: the document, its canvas and the marks being placed.
//!
//! Lifecycle: `Empty -> Loaded -> Editing { page }`, with
//! `Exporting { return_to }` while a multi-page export runs. Loading a new
//! document goes back to `Loaded` and forgets every placed mark and sync
//! record.

pub mod shortcuts;

use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::canvas::click::Clock;
use crate::canvas::edit::{EditDecision, EditHandler};
use crate::canvas::object::{AnnotationObject, ObjectId, Transform};
use crate::canvas::{CompositionCanvas, PointerButton, PointerOutcome};
use crate::config::settings::Settings;
use crate::error::DocSignError;
use crate::export::{CancelFlag, ExportArtifact, ExportFormat, ExportPipeline, PageNavigator};
use crate::mark::drawing::{DrawingSurface, StrokeColor};
use crate::mark::upload::decode_upload;
use crate::mark::{CaptureMethod, MarkBitmap, MarkKind};
use crate::render::{PageBitmap, PageRasterizer, SourceDocument, fit_to_preview};
use crate::sync::{InitialSyncEngine, PageRangeSelection, TransformEvent};
use shortcuts::{ShortcutAction, action_for};

pub use shortcuts::{Key, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Editing { page: u32 },
    Exporting { return_to: u32 },
}

/// What a keyboard shortcut did.
#[derive(Debug, Clone)]
pub enum KeyOutcome {
    Deleted(AnnotationObject),
    Placed(ObjectId),
    Exported(ExportArtifact),
}

pub struct EditorSession {
    settings: Settings,
    state: SessionState,
    document: Option<SourceDocument>,
    rasterizer: PageRasterizer,
    canvas: CompositionCanvas,
    sync: InitialSyncEngine,
    drawing: DrawingSurface,
    signature: Option<(MarkBitmap, CaptureMethod)>,
    initial: Option<(MarkBitmap, CaptureMethod)>,
    pending_recapture: Option<MarkKind>,
    page_range: PageRangeSelection,
    format: ExportFormat,
    exporter: ExportPipeline,
}

impl EditorSession {
    pub fn new(settings: Settings) -> crate::error::Result<Self> {
        settings.validate()?;
        let color = StrokeColor::from_hex(&settings.stroke_color)?;
        let canvas = CompositionCanvas::new()
            .with_double_click_window(Duration::from_millis(settings.double_click_ms))
            .with_mark_defaults(settings.signature, settings.initial);
        let drawing = DrawingSurface::new(settings.surface_width, settings.surface_height)
            .with_multiplier(settings.mark_multiplier)
            .with_default_brush(settings.stroke_width, color);

        Ok(Self {
            rasterizer: PageRasterizer::new(settings.render_scale, settings.page_cache_capacity),
            exporter: ExportPipeline::new((&settings).into()),
            settings,
            state: SessionState::Empty,
            document: None,
            canvas,
            sync: InitialSyncEngine::new(),
            drawing,
            signature: None,
            initial: None,
            pending_recapture: None,
            page_range: PageRangeSelection::All,
            format: ExportFormat::default(),
        })
    }

    pub fn with_edit_handler(mut self, handler: impl EditHandler + 'static) -> Self {
        self.canvas.set_edit_handler(handler);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.canvas = std::mem::take(&mut self.canvas).with_clock(clock);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.document.as_ref()
    }

    pub fn canvas(&self) -> &CompositionCanvas {
        &self.canvas
    }

    pub fn sync(&self) -> &InitialSyncEngine {
        &self.sync
    }

    /// Page on the canvas, if the editor is open.
    pub fn current_page(&self) -> Option<u32> {
        match self.state {
            SessionState::Editing { page } => Some(page),
            _ => None,
        }
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, SourceDocument::page_count)
    }

    fn ensure_not_exporting(&self) -> crate::error::Result<()> {
        if matches!(self.state, SessionState::Exporting { .. }) {
            Err(DocSignError::ExportInProgress)
        } else {
            Ok(())
        }
    }

    fn editing_page(&self) -> crate::error::Result<u32> {
        self.ensure_not_exporting()?;
        self.current_page()
            .ok_or_else(|| DocSignError::not_applicable("the editor is not open"))
    }

    // ============================================================
    // Document and navigation
    // ============================================================

    /// Replace the document. Placed marks, sync records and the page range
    /// are discarded; captured marks are kept.
    pub fn load_document(&mut self, document: SourceDocument) -> crate::error::Result<()> {
        self.ensure_not_exporting()?;
        info!(
            paginated = document.is_paginated(),
            pages = document.page_count(),
            fingerprint = %document.fingerprint(),
            "document loaded"
        );
        self.document = Some(document);
        self.canvas.reset();
        self.sync.reset();
        self.rasterizer.clear_cache();
        self.page_range = PageRangeSelection::All;
        self.pending_recapture = None;
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Sniff and load a PNG, JPEG or PDF file.
    pub fn load_document_bytes(&mut self, bytes: Vec<u8>) -> crate::error::Result<()> {
        self.ensure_not_exporting()?;
        let document = SourceDocument::from_bytes(bytes)?;
        self.load_document(document)
    }

    /// Show page 1 on the canvas.
    pub async fn open_editor(&mut self) -> crate::error::Result<()> {
        self.ensure_not_exporting()?;
        if self.document.is_none() {
            return Err(DocSignError::not_applicable("no document loaded"));
        }
        self.display_page(1).await
    }

    /// Navigate to `page`. Pages outside the document and the page already
    /// shown are ignored. Returns the page shown afterwards.
    pub async fn go_to_page(&mut self, page: u32) -> crate::error::Result<u32> {
        let current = self.editing_page()?;
        if page < 1 || page > self.page_count() || page == current {
            debug!(page, current, "navigation ignored");
            return Ok(current);
        }
        self.display_page(page).await?;
        Ok(page)
    }

    pub async fn next_page(&mut self) -> crate::error::Result<u32> {
        let current = self.editing_page()?;
        self.go_to_page(current.saturating_add(1)).await
    }

    pub async fn previous_page(&mut self) -> crate::error::Result<u32> {
        let current = self.editing_page()?;
        self.go_to_page(current.saturating_sub(1)).await
    }

    /// Render `page`, install it as the background and reproduce initials.
    async fn display_page(&mut self, page: u32) -> crate::error::Result<()> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| DocSignError::not_applicable("no document loaded"))?;
        let bitmap = self.rasterizer.render(document, page).await?;
        self.canvas.load_background(bitmap);
        let reproduced = self.sync.reproduce_on(&mut self.canvas, page, &self.page_range);
        if !matches!(self.state, SessionState::Exporting { .. }) {
            self.state = SessionState::Editing { page };
        }
        info!(page, reproduced = reproduced.len(), "page shown");
        Ok(())
    }

    /// Downscaled view of the canvas for display.
    pub fn preview(&self) -> crate::error::Result<RgbaImage> {
        let page = self.editing_page()?;
        let raster = self.canvas.rasterize(1.0, Some(Rgba([255, 255, 255, 255])))?;
        Ok(fit_to_preview(
            &PageBitmap::new(raster, 1.0, page),
            self.settings.preview_max_width,
            self.settings.preview_max_height,
        ))
    }

    // ============================================================
    // Mark capture
    // ============================================================

    /// Start a fresh drawing for `kind`.
    pub fn begin_drawing(&mut self, kind: MarkKind) {
        self.drawing.begin(kind);
    }

    pub fn drawing(&self) -> &DrawingSurface {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut DrawingSurface {
        &mut self.drawing
    }

    /// Make the drawing the current mark of its kind.
    ///
    /// # Errors
    /// `NothingToCommit` if nothing has been drawn; the current mark is kept.
    pub fn commit_drawing(&mut self) -> crate::error::Result<&MarkBitmap> {
        let mark = self.drawing.commit().ok_or(DocSignError::NothingToCommit)?;
        Ok(self.store_mark(mark, CaptureMethod::Draw))
    }

    /// Decode an uploaded image and make it the current mark of `kind`.
    pub async fn upload_mark(
        &mut self,
        bytes: &[u8],
        kind: MarkKind,
    ) -> crate::error::Result<&MarkBitmap> {
        let mark = decode_upload(bytes, kind).await?;
        Ok(self.store_mark(mark, CaptureMethod::Upload))
    }

    fn store_mark(&mut self, mark: MarkBitmap, method: CaptureMethod) -> &MarkBitmap {
        let kind = mark.kind();
        if self.pending_recapture == Some(kind) {
            self.pending_recapture = None;
        }
        debug!(
            %kind,
            ?method,
            width = mark.width(),
            height = mark.height(),
            "current mark replaced"
        );
        let slot = match kind {
            MarkKind::Signature => &mut self.signature,
            MarkKind::Initial => &mut self.initial,
        };
        &slot.insert((mark, method)).0
    }

    fn current(&self, kind: MarkKind) -> Option<&(MarkBitmap, CaptureMethod)> {
        match kind {
            MarkKind::Signature => self.signature.as_ref(),
            MarkKind::Initial => self.initial.as_ref(),
        }
    }

    pub fn current_mark(&self, kind: MarkKind) -> Option<&MarkBitmap> {
        self.current(kind).map(|(mark, _)| mark)
    }

    /// How the current mark of `kind` was captured, if there is one.
    pub fn capture_method(&self, kind: MarkKind) -> Option<CaptureMethod> {
        self.current(kind).map(|&(_, method)| method)
    }

    /// Kind of mark whose re-capture was requested by an edit, until a new
    /// mark of that kind is committed or uploaded.
    pub fn pending_recapture(&self) -> Option<MarkKind> {
        self.pending_recapture
    }

    // ============================================================
    // Placement and manipulation
    // ============================================================

    /// Place the current signature on the shown page.
    pub fn add_signature(&mut self) -> crate::error::Result<ObjectId> {
        self.editing_page()?;
        let (mark, _) = self
            .signature
            .as_ref()
            .ok_or_else(|| DocSignError::not_applicable("no signature captured"))?;
        self.canvas
            .place(mark)
            .ok_or_else(|| DocSignError::not_applicable("the canvas has no page"))
    }

    /// Place the current initial on the shown page and start syncing it.
    ///
    /// # Errors
    /// `PageExcluded` if the page range does not include the shown page.
    pub fn add_initial(&mut self) -> crate::error::Result<ObjectId> {
        let page = self.editing_page()?;
        if !self.page_range.includes(page) {
            warn!(page, range = %self.page_range.to_range_text(), "initial not placed: page excluded");
            return Err(DocSignError::PageExcluded(page));
        }
        let (mark, _) = self
            .initial
            .as_ref()
            .ok_or_else(|| DocSignError::not_applicable("no initial captured"))?;
        let id = self
            .canvas
            .place(mark)
            .ok_or_else(|| DocSignError::not_applicable("the canvas has no page"))?;
        if let Some(object) = self.canvas.get(id) {
            self.sync.on_place(object);
        }
        Ok(id)
    }

    /// Pointer press on the document canvas.
    ///
    /// A re-capture decision on an initial always starts a fresh initial
    /// drawing. A signature re-enters the flow it came from: drawn
    /// signatures get a fresh drawing, uploaded ones wait for the next upload.
    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) -> PointerOutcome {
        if self.editing_page().is_err() {
            return PointerOutcome::Ignored;
        }
        let outcome = self.canvas.pointer_down(x, y, button);
        if let PointerOutcome::Edited(edit) = &outcome
            && edit.decision == EditDecision::Recapture
        {
            let kind = edit.object.kind();
            self.pending_recapture = Some(kind);
            let awaits_upload = kind == MarkKind::Signature
                && self.capture_method(kind) == Some(CaptureMethod::Upload);
            if !awaits_upload {
                self.drawing.begin(kind);
            }
        }
        outcome
    }

    fn manipulate_selected(
        &mut self,
        event: TransformEvent,
        f: impl FnOnce(&mut CompositionCanvas, ObjectId) -> Option<&AnnotationObject>,
    ) -> Option<Transform> {
        if self.editing_page().is_err() {
            return None;
        }
        let id = self.canvas.selected_id()?;
        let object = f(&mut self.canvas, id)?;
        self.sync.on_transform(object, event);
        Some(object.transform())
    }

    /// Move the selected mark by (`dx`, `dy`) canvas pixels.
    pub fn drag_selected(&mut self, dx: f32, dy: f32) -> Option<Transform> {
        self.manipulate_selected(TransformEvent::Moving, |canvas, id| {
            canvas.translate(id, dx, dy)
        })
    }

    pub fn scale_selected(&mut self, scale_x: f32, scale_y: f32) -> Option<Transform> {
        self.manipulate_selected(TransformEvent::Scaling, |canvas, id| {
            canvas.set_scale(id, scale_x, scale_y)
        })
    }

    /// Set the selected mark's rotation in degrees.
    pub fn rotate_selected(&mut self, angle: f32) -> Option<Transform> {
        self.manipulate_selected(TransformEvent::Rotating, |canvas, id| {
            canvas.set_angle(id, angle)
        })
    }

    pub fn delete_selected(&mut self) -> Option<AnnotationObject> {
        if self.editing_page().is_err() {
            return None;
        }
        self.canvas.delete_selected()
    }

    // ============================================================
    // Page range and format
    // ============================================================

    /// Takes effect at the next navigation.
    pub fn set_page_range(&mut self, selection: PageRangeSelection) {
        debug!(range = %selection.to_range_text(), "page range set");
        self.page_range = selection;
    }

    /// `"all"` (or blank) selects every page; anything else is parsed
    /// leniently as a range expression.
    pub fn set_page_range_text(&mut self, text: &str) {
        self.set_page_range(PageRangeSelection::from_text(text));
    }

    pub fn page_range(&self) -> &PageRangeSelection {
        &self.page_range
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    // ============================================================
    // Export
    // ============================================================

    /// Export the shown page in the selected format.
    pub fn export_current_page(&self) -> crate::error::Result<ExportArtifact> {
        let page = self.editing_page()?;
        self.exporter.export_current_page(&self.canvas, page, self.format)
    }

    /// Export `pages` as one PDF, then show the page that was shown before,
    /// whether or not the export succeeded.
    ///
    /// # Errors
    /// `NotApplicable` for image documents or a non-PDF format.
    pub async fn export_all_pages(
        &mut self,
        pages: &PageRangeSelection,
        cancel: &CancelFlag,
    ) -> crate::error::Result<ExportArtifact> {
        let return_to = self.editing_page()?;
        if !self.document.as_ref().is_some_and(SourceDocument::is_paginated) {
            return Err(DocSignError::not_applicable(
                "multi-page export needs a paginated document",
            ));
        }
        if self.format != ExportFormat::Pdf {
            return Err(DocSignError::not_applicable(format!(
                "multi-page export is only available as PDF, not {}",
                self.format
            )));
        }

        self.state = SessionState::Exporting { return_to };
        let exporter = self.exporter.clone();
        let result = exporter.export_all_pages(self, pages, cancel).await;

        let restored = self.display_page(return_to).await;
        self.state = SessionState::Editing { page: return_to };
        if let Err(e) = &result {
            warn!(error = %e, return_to, "multi-page export failed");
        }
        let artifact = result?;
        restored?;
        Ok(artifact)
    }

    /// Export the pages of the session's own page range.
    pub async fn export_selected_pages(
        &mut self,
        cancel: &CancelFlag,
    ) -> crate::error::Result<ExportArtifact> {
        let pages = self.page_range.clone();
        self.export_all_pages(&pages, cancel).await
    }

    // ============================================================
    // Keyboard
    // ============================================================

    /// Apply a keyboard shortcut. Keys without a binding, or whose action
    /// has nothing to act on, return `Ok(None)`.
    pub fn handle_key(&mut self, event: KeyEvent) -> crate::error::Result<Option<KeyOutcome>> {
        let Some(action) = action_for(event) else {
            return Ok(None);
        };
        if self.editing_page().is_err() {
            return Ok(None);
        }
        match action {
            ShortcutAction::DeleteSelected => Ok(self.delete_selected().map(KeyOutcome::Deleted)),
            ShortcutAction::PlaceSignature => {
                if self.signature.is_none() {
                    return Ok(None);
                }
                self.add_signature().map(|id| Some(KeyOutcome::Placed(id)))
            }
            ShortcutAction::ExportCurrentPage => self
                .export_current_page()
                .map(|artifact| Some(KeyOutcome::Exported(artifact))),
        }
    }
}

impl PageNavigator for EditorSession {
    fn is_paginated(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(SourceDocument::is_paginated)
    }

    fn page_count(&self) -> u32 {
        EditorSession::page_count(self)
    }

    fn show_page(&mut self, page_index: u32) -> LocalBoxFuture<'_, crate::error::Result<()>> {
        self.display_page(page_index).boxed_local()
    }

    fn canvas(&self) -> &CompositionCanvas {
        &self.canvas
    }
}
