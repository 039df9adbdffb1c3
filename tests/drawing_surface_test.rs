// Freehand drawing surface and mark upload tests

use std::io::Cursor;

use doc_signer::config::settings::Settings;
use doc_signer::error::DocSignError;
use doc_signer::mark::MarkKind;
use doc_signer::mark::drawing::{DrawingSurface, StrokeColor};
use doc_signer::mark::upload::decode_upload;
use doc_signer::session::EditorSession;
use image::{ImageFormat, Rgba, RgbaImage};

fn surface() -> DrawingSurface {
    let mut surface = DrawingSurface::new(200, 100);
    surface.begin(MarkKind::Signature);
    surface
}

// ============================================================
// 1. Empty commit is a no-op
// ============================================================

#[test]
fn test_commit_without_strokes_returns_none() {
    let mut surface = surface();
    assert!(surface.commit().is_none(), "empty surface should not commit");
    assert!(surface.is_empty());
}

#[test]
fn test_session_commit_empty_keeps_current_mark() {
    let mut session = EditorSession::new(Settings::default()).expect("session");

    session.begin_drawing(MarkKind::Initial);
    session.drawing_mut().add_stroke(&[(10.0, 10.0), (60.0, 40.0)]);
    let first = session.commit_drawing().expect("first commit").clone();

    session.begin_drawing(MarkKind::Initial);
    let err = session.commit_drawing().unwrap_err();
    assert!(
        matches!(err, DocSignError::NothingToCommit),
        "expected NothingToCommit, got {err:?}"
    );

    let current = session.current_mark(MarkKind::Initial).expect("initial kept");
    assert_eq!(
        current.image().as_raw(),
        first.image().as_raw(),
        "current initial should be unchanged"
    );
    assert!(session.current_mark(MarkKind::Signature).is_none());
}

// ============================================================
// 2. Committed marks are transparent and scaled by the multiplier
// ============================================================

#[test]
fn test_commit_produces_transparent_bitmap_at_multiplier() {
    let mut surface = surface();
    surface.set_stroke_width(6.0);
    surface.add_stroke(&[(20.0, 50.0), (180.0, 50.0)]);

    let mark = surface.commit().expect("mark");
    assert_eq!(mark.kind(), MarkKind::Signature);
    assert_eq!((mark.width(), mark.height()), (400, 200), "default multiplier is 2");

    let corner = mark.image().get_pixel(0, 0);
    assert_eq!(corner.0[3], 0, "background should be transparent, got {corner:?}");

    let on_stroke = mark.image().get_pixel(200, 100);
    assert_eq!(on_stroke.0[3], 255, "stroke should be opaque, got {on_stroke:?}");
    assert!(on_stroke.0[0] < 16, "default brush is black, got {on_stroke:?}");
}

#[test]
fn test_preview_has_white_background_while_drawing() {
    let mut surface = surface();
    surface.add_stroke(&[(20.0, 50.0), (180.0, 50.0)]);
    let preview = surface.preview().expect("preview");
    assert_eq!(preview.dimensions(), (200, 100));
    assert_eq!(preview.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
}

#[test]
fn test_single_point_stroke_draws_a_dot() {
    let mut surface = surface();
    surface.set_stroke_width(10.0);
    surface.pointer_down(50.0, 50.0);
    surface.pointer_up();
    let mark = surface.commit().expect("dot commits");
    assert_eq!(mark.image().get_pixel(100, 100).0[3], 255);
}

// ============================================================
// 3. Brush settings
// ============================================================

#[test]
fn test_stroke_color_is_applied() {
    let mut surface = surface();
    surface.set_stroke_color(StrokeColor::from_hex("#ff0000").unwrap());
    surface.set_stroke_width(8.0);
    surface.add_stroke(&[(20.0, 50.0), (180.0, 50.0)]);
    let mark = surface.commit().unwrap();
    let px = mark.image().get_pixel(200, 100);
    assert!(px.0[0] > 240 && px.0[1] < 16 && px.0[2] < 16, "expected red, got {px:?}");
}

#[test]
fn test_non_positive_stroke_width_is_ignored() {
    let mut surface = surface();
    surface.set_stroke_width(5.0);
    surface.set_stroke_width(0.0);
    surface.set_stroke_width(-3.0);
    assert_eq!(surface.stroke_width(), 5.0);
}

#[test]
fn test_begin_resets_brush_and_strokes() {
    let mut surface = surface();
    surface.set_stroke_width(9.0);
    surface.add_stroke(&[(1.0, 1.0), (2.0, 2.0)]);
    surface.begin(MarkKind::Initial);
    assert!(surface.is_empty());
    assert_eq!(surface.stroke_width(), 2.0);
    assert_eq!(surface.kind(), MarkKind::Initial);
}

#[test]
fn test_clear_removes_strokes() {
    let mut surface = surface();
    surface.add_stroke(&[(1.0, 1.0), (20.0, 20.0)]);
    surface.pointer_down(5.0, 5.0);
    assert_eq!(surface.stroke_count(), 2);
    surface.clear();
    assert!(surface.commit().is_none());
}

// ============================================================
// 4. Uploads
// ============================================================

#[tokio::test]
async fn test_upload_keeps_raster_verbatim() {
    let img = RgbaImage::from_pixel(30, 12, Rgba([10, 20, 30, 255]));
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png).unwrap();

    let mark = decode_upload(png.get_ref(), MarkKind::Initial).await.expect("decode");
    assert_eq!(mark.kind(), MarkKind::Initial);
    assert_eq!((mark.width(), mark.height()), (30, 12));
    assert_eq!(mark.image().get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
}

#[tokio::test]
async fn test_upload_rejects_undecodable_bytes_without_state_change() {
    let mut session = EditorSession::new(Settings::default()).unwrap();
    let err = session
        .upload_mark(b"not an image", MarkKind::Signature)
        .await
        .unwrap_err();
    assert!(
        matches!(err, DocSignError::UnsupportedMarkFormat(_)),
        "expected UnsupportedMarkFormat, got {err:?}"
    );
    assert!(session.current_mark(MarkKind::Signature).is_none());
}
