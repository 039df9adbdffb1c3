// E2E: capture an initial, sync it across a page range and export the document
//
// 3ページの文書にイニシャルを配置し、範囲 "1,3" で同期した結果を
// 全ページPDFとして書き出し、ページごとの画素を検証する。

use doc_signer::canvas::object::Transform;
use doc_signer::config::settings::Settings;
use doc_signer::export::{CancelFlag, ExportFormat};
use doc_signer::mark::MarkKind;
use doc_signer::render::SourceDocument;
use doc_signer::render::sequence::ImageSequence;
use doc_signer::session::EditorSession;
use doc_signer::sync::PageRangeSelection;
use image::{DynamicImage, Rgba, RgbaImage};
use lopdf::{Document, Object};

/// Canvas point on the stroke once the initial sits at (120, 210).
///
/// The stroke runs along y=100 of the 500x200 surface, i.e. y=200 of the
/// 1000x400 bitmap, which scale 0.6 maps to 210 + 120.
const STROKE_POINT: (u32, u32) = (420, 330);

fn three_white_pages() -> SourceDocument {
    let pages = (0..3)
        .map(|_| DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 500, Rgba([255; 4]))))
        .collect();
    SourceDocument::paginated(ImageSequence::new(pages).unwrap())
}

/// Decoded RGB image of every page, as (width, height, pixels).
fn page_rasters(pdf: &[u8]) -> Vec<(u32, u32, Vec<u8>)> {
    let doc = Document::load_mem(pdf).expect("valid PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let resources = match page.get(b"Resources").unwrap() {
                Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
                Object::Dictionary(d) => d,
                other => panic!("unexpected Resources: {other:?}"),
            };
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let image_id = xobjects.get(b"PageImg").unwrap().as_reference().unwrap();
            let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();

            let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap() as u32;
            let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap() as u32;
            let pixels = stream.decompressed_content().expect("Flate image data");
            assert_eq!(pixels.len(), (width * height * 3) as usize);
            (width, height, pixels)
        })
        .collect()
}

fn luma_at(raster: &(u32, u32, Vec<u8>), x: u32, y: u32) -> u32 {
    let (width, _, pixels) = raster;
    let i = ((y * width + x) * 3) as usize;
    (pixels[i] as u32 + pixels[i + 1] as u32 + pixels[i + 2] as u32) / 3
}

#[tokio::test]
async fn test_initial_synced_to_selected_pages_and_exported() {
    let settings = Settings {
        settle_delay_ms: 0,
        ..Settings::default()
    };
    let mut session = EditorSession::new(settings).unwrap();
    session.load_document(three_white_pages()).unwrap();
    session.open_editor().await.unwrap();
    assert_eq!(session.canvas().dimensions(), Some((800, 1000)));

    // ============================================================
    // 1. Capture and place the initial on page 1
    // ============================================================
    session.begin_drawing(MarkKind::Initial);
    session.drawing_mut().set_stroke_width(30.0);
    session
        .drawing_mut()
        .add_stroke(&[(20.0, 100.0), (480.0, 100.0)]);
    session.commit_drawing().unwrap();

    session.add_initial().unwrap();
    let moved = session.drag_selected(20.0, 10.0).unwrap();
    assert_eq!((moved.left, moved.top), (120.0, 210.0));

    // ============================================================
    // 2. Restrict to pages 1 and 3, then navigate
    // ============================================================
    session.set_page_range_text("1,3");

    session.go_to_page(2).await.unwrap();
    assert!(
        session.canvas().annotations().is_empty(),
        "page 2 is outside the range"
    );

    session.go_to_page(3).await.unwrap();
    let on_three = session.canvas().annotations();
    assert_eq!(on_three.len(), 1, "page 3 gets the initial");
    assert_eq!(on_three[0].kind(), MarkKind::Initial);
    assert_eq!(on_three[0].transform(), Transform::new(120.0, 210.0, 0.6));

    // ============================================================
    // 3. Export every page as PDF
    // ============================================================
    session.set_format(ExportFormat::Pdf);
    let artifact = session
        .export_all_pages(&PageRangeSelection::All, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(artifact.filename, "signed-document-all-pages.pdf");
    assert_eq!(artifact.page_count, 3);

    let rasters = page_rasters(&artifact.bytes);
    assert_eq!(rasters.len(), 3);
    let (x, y) = STROKE_POINT;
    for (i, raster) in rasters.iter().enumerate() {
        assert_eq!((raster.0, raster.1), (800, 1000), "page {} size", i + 1);
        assert!(luma_at(raster, 10, 10) > 245, "page {} corner is white", i + 1);
    }
    assert!(luma_at(&rasters[0], x, y) < 64, "page 1 shows the initial");
    assert!(luma_at(&rasters[1], x, y) > 245, "page 2 stays blank");
    assert!(luma_at(&rasters[2], x, y) < 64, "page 3 shows the initial");

    // The editor is back on page 3 with its initial.
    assert_eq!(session.current_page(), Some(3));
    assert_eq!(session.canvas().annotations().len(), 1);

    // ============================================================
    // 4. The session range picks the selected-pages export
    // ============================================================
    let selected = session.export_selected_pages(&CancelFlag::new()).await.unwrap();
    assert_eq!(selected.filename, "signed-document-selected-pages.pdf");
    assert_eq!(selected.page_count, 2);
}
