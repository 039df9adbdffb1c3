// Uploaded mark image -> MarkBitmap (used as-is, no background substitution)

use tracing::debug;

use super::{MarkBitmap, MarkKind};
use crate::error::DocSignError;

/// Largest accepted mark upload. Enforced by callers before decoding.
pub const MAX_MARK_BYTES: usize = 5 * 1024 * 1024;

/// Decode an uploaded image into a mark.
///
/// The raster is used verbatim; uploads are assumed to be prepared by the
/// user. Decoding is exposed as an async operation like every other bitmap
/// load.
///
/// # Errors
/// `UnsupportedMarkFormat` if the bytes are not a decodable image.
pub async fn decode_upload(bytes: &[u8], kind: MarkKind) -> crate::error::Result<MarkBitmap> {
    let image =
        image::load_from_memory(bytes).map_err(|e| DocSignError::unsupported_mark(e.to_string()))?;
    let rgba = image.to_rgba8();
    debug!(%kind, width = rgba.width(), height = rgba.height(), "decoded uploaded mark");
    Ok(MarkBitmap::new(rgba, kind))
}
