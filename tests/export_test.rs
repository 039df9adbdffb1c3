// Export pipeline tests: current page formats, multi-page PDF ordering

use doc_signer::canvas::CompositionCanvas;
use doc_signer::config::settings::Settings;
use doc_signer::error::DocSignError;
use doc_signer::export::{
    ArtifactSink, CancelFlag, DirectorySink, ExportFormat, ExportOptions, ExportPipeline,
    MemorySink,
};
use doc_signer::mark::{MarkBitmap, MarkKind};
use doc_signer::pdf::writer::PT_PER_MM;
use doc_signer::render::sequence::ImageSequence;
use doc_signer::render::{PageBitmap, SourceDocument};
use doc_signer::session::{EditorSession, SessionState};
use doc_signer::sync::PageRangeSelection;
use image::{DynamicImage, Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Resampling may shift channels by a unit or two.
fn assert_near(actual: &Rgba<u8>, expected: Rgba<u8>) {
    let close = actual
        .0
        .iter()
        .zip(expected.0)
        .all(|(&a, e)| a.abs_diff(e) <= 2);
    assert!(close, "expected ~{expected:?}, got {actual:?}");
}

fn canvas(width: u32, height: u32) -> CompositionCanvas {
    let mut canvas = CompositionCanvas::new();
    canvas.load_background(PageBitmap::new(
        RgbaImage::from_pixel(width, height, WHITE),
        1.0,
        1,
    ));
    canvas
}

/// Pages are 100+10i pixels wide so each page is identifiable by its width.
fn sequence(pages: u32) -> SourceDocument {
    let images = (0..pages)
        .map(|i| DynamicImage::ImageRgba8(RgbaImage::from_pixel(100 + 10 * i, 140, WHITE)))
        .collect();
    SourceDocument::paginated(ImageSequence::new(images).expect("sequence"))
}

fn fast_settings() -> Settings {
    Settings {
        settle_delay_ms: 0,
        ..Settings::default()
    }
}

async fn session_for(document: SourceDocument) -> EditorSession {
    let mut session = EditorSession::new(fast_settings()).expect("session");
    session.load_document(document).expect("load");
    session.open_editor().await.expect("open editor");
    session.set_format(ExportFormat::Pdf);
    session
}

/// MediaBox (width, height) in points of every page, in page order.
fn media_boxes(pdf: &[u8]) -> Vec<(f32, f32)> {
    let doc = lopdf::Document::load_mem(pdf).expect("valid PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let mb = page.get(b"MediaBox").unwrap().as_array().unwrap();
            (mb[2].as_float().unwrap(), mb[3].as_float().unwrap())
        })
        .collect()
}

/// Pixel width of the image on every page, in page order.
fn page_image_widths(pdf: &[u8]) -> Vec<u32> {
    let doc = lopdf::Document::load_mem(pdf).expect("valid PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let resources = doc
                .get_dictionary(page.get(b"Resources").unwrap().as_reference().unwrap())
                .unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            assert_eq!(xobjects.len(), 1, "one image per page");
            let (_, image) = xobjects.iter().next().unwrap();
            let stream = doc
                .get_object(image.as_reference().unwrap())
                .and_then(lopdf::Object::as_stream)
                .unwrap();
            stream.dict.get(b"Width").unwrap().as_i64().unwrap() as u32
        })
        .collect()
}

// ============================================================
// 1. Current page: PNG / JPG
// ============================================================

#[test]
fn test_png_export_is_lossless_at_multiplier_two() {
    let mut canvas = canvas(200, 100);
    let red = RgbaImage::from_pixel(100, 50, Rgba([255, 0, 0, 255]));
    canvas.place(&MarkBitmap::new(red, MarkKind::Signature)).unwrap();

    let artifact = ExportPipeline::default()
        .export_current_page(&canvas, 2, ExportFormat::Png)
        .unwrap();
    assert_eq!(artifact.filename, "signed-document-page-2.png");
    assert_eq!(artifact.page_count, 1);

    let decoded = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (400, 200));
    assert_near(decoded.get_pixel(240, 220), Rgba([255, 0, 0, 255]));
    assert_eq!(decoded.get_pixel(10, 10), &WHITE);
}

#[test]
fn test_jpg_export_has_white_background() {
    // Transparent page: the export must not come out black.
    let mut canvas = CompositionCanvas::new();
    canvas.load_background(PageBitmap::new(RgbaImage::new(50, 40), 1.0, 1));

    let artifact = ExportPipeline::default()
        .export_current_page(&canvas, 1, ExportFormat::Jpg)
        .unwrap();
    assert_eq!(artifact.filename, "signed-document-page-1.jpg");
    let decoded = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (100, 80));
    let px = decoded.get_pixel(50, 40);
    assert!(px.0.iter().all(|&c| c > 245), "expected white, got {px:?}");
}

#[test]
fn test_export_without_page_is_not_applicable() {
    let err = ExportPipeline::default()
        .export_current_page(&CompositionCanvas::new(), 1, ExportFormat::Png)
        .unwrap_err();
    assert!(matches!(err, DocSignError::NotApplicable(_)), "got {err:?}");
}

// ============================================================
// 2. Current page: PDF aspect ratio
// ============================================================

#[test]
fn test_pdf_page_is_210mm_wide_with_canvas_aspect() {
    let canvas = canvas(400, 300);
    let artifact = ExportPipeline::default()
        .export_current_page(&canvas, 1, ExportFormat::Pdf)
        .unwrap();
    assert_eq!(artifact.filename, "signed-document-page-1.pdf");

    let boxes = media_boxes(&artifact.bytes);
    assert_eq!(boxes.len(), 1);
    let (w, h) = boxes[0];
    assert!((w - 210.0 * PT_PER_MM).abs() < 0.01, "width {w}pt");
    assert!((h - 157.5 * PT_PER_MM).abs() < 0.01, "height {h}pt");

    // Canvas raster at multiplier 1, JPEG encoded.
    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    let has_dct = doc.objects.values().any(|o| {
        o.as_stream()
            .ok()
            .and_then(|s| s.dict.get(b"Filter").ok())
            .and_then(|f| f.as_name().ok())
            == Some(b"DCTDecode".as_slice())
    });
    assert!(has_dct, "single page PDF should embed a JPEG");
    assert_eq!(page_image_widths(&artifact.bytes), vec![400]);
}

#[test]
fn test_pdf_page_height_for_portrait_canvas() {
    let canvas = canvas(1000, 1414);
    let artifact = ExportPipeline::new(ExportOptions::default())
        .export_current_page(&canvas, 1, ExportFormat::Pdf)
        .unwrap();
    let (_, h) = media_boxes(&artifact.bytes)[0];
    let expected_mm = 1414.0 * 210.0 / 1000.0;
    assert!((h / PT_PER_MM - expected_mm).abs() < 0.01, "height {h}pt");
}

// ============================================================
// 3. All pages: ordering and count
// ============================================================

#[tokio::test]
async fn test_all_pages_exports_every_page_in_order() {
    let mut session = session_for(sequence(5)).await;
    let artifact = session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(artifact.filename, "signed-document-all-pages.pdf");
    assert_eq!(artifact.page_count, 5);
    // Rendered at scale 2, rasterized at multiplier 1.
    assert_eq!(
        page_image_widths(&artifact.bytes),
        vec![200, 220, 240, 260, 280]
    );
}

#[tokio::test]
async fn test_custom_selection_exports_only_selected_pages() {
    let mut session = session_for(sequence(5)).await;
    let artifact = session
        .export_all_pages(&PageRangeSelection::custom([4, 2]), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(artifact.filename, "signed-document-selected-pages.pdf");
    assert_eq!(page_image_widths(&artifact.bytes), vec![220, 260]);
}

#[tokio::test]
async fn test_each_page_keeps_its_own_aspect_ratio() {
    let mut session = session_for(sequence(3)).await;
    let artifact = session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap();

    let boxes = media_boxes(&artifact.bytes);
    for (i, (w, h)) in boxes.iter().enumerate() {
        let width_px = 100.0 + 10.0 * i as f32;
        let expected_h = 140.0 * 210.0 / width_px * PT_PER_MM;
        assert!((w - 210.0 * PT_PER_MM).abs() < 0.01, "page {} width {w}", i + 1);
        assert!((h - expected_h).abs() < 0.05, "page {} height {h}", i + 1);
    }

    // The first page also sets the document default size.
    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    let catalog = doc.catalog().unwrap();
    let pages_id = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = doc.get_dictionary(pages_id).unwrap();
    let mb = pages.get(b"MediaBox").unwrap().as_array().unwrap();
    assert!((mb[3].as_float().unwrap() - boxes[0].1).abs() < 0.01);
}

#[tokio::test]
async fn test_pages_past_the_end_are_dropped() {
    let mut session = session_for(sequence(3)).await;
    let artifact = session
        .export_all_pages(&PageRangeSelection::custom([3, 7]), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(artifact.page_count, 1);
}

// ============================================================
// 4. All pages: navigation restore, cancellation, applicability
// ============================================================

#[tokio::test]
async fn test_export_restores_the_page_shown_before() {
    let mut session = session_for(sequence(4)).await;
    session.go_to_page(3).await.unwrap();

    session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Editing { page: 3 });
    assert_eq!(session.canvas().background().unwrap().page_index(), 3);
}

#[tokio::test]
async fn test_cancelled_export_returns_no_pdf_and_restores() {
    let mut session = session_for(sequence(4)).await;
    session.go_to_page(2).await.unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = session
        .export_all_pages(&PageRangeSelection::All, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DocSignError::Cancelled), "got {err:?}");
    assert_eq!(session.current_page(), Some(2));
}

#[tokio::test]
async fn test_image_document_cannot_export_all_pages() {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(60, 40, WHITE));
    let mut session = session_for(SourceDocument::from_image(image)).await;
    let err = session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DocSignError::NotApplicable(_)), "got {err:?}");

    // The single-page export is the fallback.
    let artifact = session.export_current_page().unwrap();
    assert_eq!(artifact.filename, "signed-document-page-1.pdf");
}

#[tokio::test]
async fn test_all_pages_requires_pdf_format() {
    let mut session = session_for(sequence(2)).await;
    session.set_format(ExportFormat::Png);
    let err = session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DocSignError::NotApplicable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_settle_delay_is_honoured() {
    let settings = Settings {
        settle_delay_ms: 20,
        ..Settings::default()
    };
    let mut session = EditorSession::new(settings).unwrap();
    session.load_document(sequence(2)).unwrap();
    session.open_editor().await.unwrap();
    session.set_format(ExportFormat::Pdf);

    let started = std::time::Instant::now();
    session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap();
    assert!(
        started.elapsed() >= std::time::Duration::from_millis(40),
        "two pages should wait at least 2 x 20 ms"
    );
}

// ============================================================
// 5. Sinks
// ============================================================

#[test]
fn test_directory_sink_writes_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out");
    let artifact = ExportPipeline::default()
        .export_current_page(&canvas(20, 20), 1, ExportFormat::Png)
        .unwrap();
    let bytes = artifact.bytes.clone();

    let mut sink = DirectorySink::new(&out);
    let path = sink.deliver(artifact).unwrap();
    assert_eq!(path, out.join("signed-document-page-1.png"));
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_memory_sink_collects_artifacts() {
    let mut sink = MemorySink::new();
    for format in [ExportFormat::Png, ExportFormat::Jpg] {
        let artifact = ExportPipeline::default()
            .export_current_page(&canvas(20, 20), 1, format)
            .unwrap();
        sink.deliver(artifact).unwrap();
    }
    let names: Vec<_> = sink.artifacts().iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, ["signed-document-page-1.png", "signed-document-page-1.jpg"]);
}
