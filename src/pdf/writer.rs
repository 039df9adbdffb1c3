// ページ画像 → PDF組立（画像XObject、ページごとのMediaBox）

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::error::DocSignError;

/// Points per millimetre (72 pt per inch, 25.4 mm per inch).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// An encoded page raster ready to become an image XObject.
#[derive(Debug, Clone)]
pub enum PageImage {
    /// Baseline JPEG bytes (`DCTDecode`).
    Jpeg { data: Vec<u8>, width: u32, height: u32 },
    /// zlib-compressed 8-bit RGB samples (`FlateDecode`).
    Flate { data: Vec<u8>, width: u32, height: u32 },
}

impl PageImage {
    pub fn width(&self) -> u32 {
        match self {
            PageImage::Jpeg { width, .. } | PageImage::Flate { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            PageImage::Jpeg { height, .. } | PageImage::Flate { height, .. } => *height,
        }
    }
}

/// PDF Name仕様に従って名前をエスケープする（区切り文字・空白・非ASCIIを#XXへ）。
fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        let regular = b.is_ascii_graphic()
            && !matches!(
                b,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if regular {
            out.push(b as char);
        } else {
            out.push_str(&format!("#{b:02X}"));
        }
    }
    out
}

/// 1ページ1画像のPDFを順に組み立てる。
///
/// 各ページは自身のMediaBoxを持つ。最初のページの寸法はPagesノードの
/// MediaBox（文書の既定ページサイズ）にもなる。
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    first_page_size: Option<(f32, f32)>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            first_page_size: None,
        }
    }

    /// 画像XObjectを追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_image_xobject(&mut self, image: &PageImage) -> ObjectId {
        let (data, filter) = match image {
            PageImage::Jpeg { data, .. } => (data, "DCTDecode"),
            PageImage::Flate { data, .. } => (data, "FlateDecode"),
        };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => filter,
        };
        let stream = Stream::new(dict, data.clone());
        self.doc.add_object(Object::Stream(stream))
    }

    /// 画像をページ全体に描画するコンテンツストリームを生成する。
    ///
    /// `q <width> 0 0 <height> 0 0 cm /<name> Do Q`
    pub fn build_image_content_stream(name: &str, width_pt: f32, height_pt: f32) -> Vec<u8> {
        let name = escape_name(name);
        format!("q {width_pt:.4} 0 0 {height_pt:.4} 0 0 cm /{name} Do Q").into_bytes()
    }

    /// 画像1枚を全面に配置したページを追加する。
    ///
    /// ページ寸法はミリメートルで指定する。
    pub fn add_image_page(
        &mut self,
        image: &PageImage,
        width_mm: f32,
        height_mm: f32,
    ) -> crate::error::Result<ObjectId> {
        if !(width_mm.is_finite() && height_mm.is_finite()) || width_mm <= 0.0 || height_mm <= 0.0
        {
            return Err(DocSignError::pdf_write(format!(
                "invalid page size: {width_mm} x {height_mm} mm"
            )));
        }

        let width_pt = width_mm * PT_PER_MM;
        let height_pt = height_mm * PT_PER_MM;

        let image_id = self.add_image_xobject(image);

        let mut xobject_dict = lopdf::Dictionary::new();
        xobject_dict.set("PageImg", Object::Reference(image_id));
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_bytes = Self::build_image_content_stream("PageImg", width_pt, height_pt);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box(width_pt, height_pt),
            "Resources" => resources_id,
            "Contents" => content_id,
        });

        self.kids.push(page_id.into());
        if self.first_page_size.is_none() {
            self.first_page_size = Some((width_pt, height_pt));
        }
        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Pagesノードとカタログを確定し、PDFドキュメントをバイト列として出力する。
    pub fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        let (width_pt, height_pt) = self
            .first_page_size
            .ok_or_else(|| DocSignError::pdf_write("cannot write a PDF without pages"))?;

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => self.kids.len() as i64,
            "MediaBox" => media_box(width_pt, height_pt),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| DocSignError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

fn media_box(width_pt: f32, height_pt: f32) -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width_pt),
        Object::Real(height_pt),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_name_keeps_regular_characters() {
        assert_eq!(escape_name("PageImg"), "PageImg");
    }

    #[test]
    fn test_escape_name_escapes_delimiters() {
        assert_eq!(escape_name("Bg Img"), "Bg#20Img");
        assert_eq!(escape_name("Fg/Img"), "Fg#2FImg");
    }
}
