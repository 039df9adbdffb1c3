use lopdf::Document;

use crate::error::DocSignError;

pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// 指定ページ辞書からMediaBoxを取得する（Parent経由の継承も考慮）。
    fn get_media_box(&self, dict: &lopdf::Dictionary) -> crate::error::Result<lopdf::Object> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return Ok(obj.clone());
        }

        if let Ok(lopdf::Object::Reference(parent_id)) = dict.get(b"Parent") {
            let parent_dict = self.doc.get_dictionary(*parent_id)?;
            return self.get_media_box(parent_dict);
        }

        Err(DocSignError::pdf_read("MediaBox not found"))
    }

    /// 指定ページ(1-indexed)のMediaBoxからページ寸法(width_pts, height_pts)を返す。
    pub fn page_dimensions(&self, page_num: u32) -> crate::error::Result<(f64, f64)> {
        let page_id = self.get_page_id(page_num)?;
        let page_dict = self.doc.get_dictionary(page_id)?;

        let media_box = self.get_media_box(page_dict)?;
        let media_box = match media_box {
            lopdf::Object::Reference(id) => self.doc.get_object(id)?.clone(),
            other => other,
        };

        let media_box_array = media_box.as_array()?;
        if media_box_array.len() < 4 {
            return Err(DocSignError::pdf_read("Invalid MediaBox"));
        }

        // MediaBoxの値は整数または実数の可能性がある
        let to_f64 = |obj: &lopdf::Object| -> crate::error::Result<f64> {
            match obj {
                lopdf::Object::Integer(i) => Ok(*i as f64),
                lopdf::Object::Real(f) => Ok(*f as f64),
                _ => Err(DocSignError::pdf_read("Invalid MediaBox value")),
            }
        };

        let x0 = to_f64(&media_box_array[0])?;
        let y0 = to_f64(&media_box_array[1])?;
        let x1 = to_f64(&media_box_array[2])?;
        let y1 = to_f64(&media_box_array[3])?;

        let width = (x1 - x0).abs();
        let height = (y1 - y0).abs();

        if width <= 0.0 || height <= 0.0 {
            return Err(DocSignError::pdf_read(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }

        Ok((width, height))
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<lopdf::ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&page_num)
            .copied()
            .ok_or_else(|| DocSignError::pdf_read(format!("page {} not found", page_num)))
    }
}
