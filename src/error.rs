use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocSignError {
    #[error("Invalid page index: {page} (document has {page_count} pages)")]
    InvalidPageIndex { page: u32, page_count: u32 },

    #[error("Page out of range: {page} (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Unsupported document format: {0}")]
    UnsupportedDocumentFormat(String),

    #[error("Unsupported mark format: {0}")]
    UnsupportedMarkFormat(String),

    #[error("Nothing to commit: the drawing surface has no strokes")]
    NothingToCommit,

    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("Page {0} is not in the selected page range")]
    PageExcluded(u32),

    #[error("Export in progress")]
    ExportInProgress,

    #[error("Export cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`DocSignError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl DocSignError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create an unsupported document format error.
    unsupported_document => UnsupportedDocumentFormat,
    /// Create an unsupported mark format error.
    unsupported_mark => UnsupportedMarkFormat,
    /// Create a not-applicable error.
    not_applicable => NotApplicable,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a render error.
    render => RenderError,
    /// Create an encode error.
    encode => EncodeError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
}

impl From<lopdf::Error> for DocSignError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_yml::Error> for DocSignError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

#[cfg(feature = "pdfium")]
impl From<pdfium_render::prelude::PdfiumError> for DocSignError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RenderError(e.to_string())
    }
}

impl From<image::ImageError> for DocSignError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocSignError>;
