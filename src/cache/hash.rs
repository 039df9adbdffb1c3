// SHA-256（ドキュメント識別子 + ページ + スケール）
//
// Computes document fingerprints and page cache keys. Keys are SHA-256
// hashes encoded as lowercase hexadecimal strings.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// 複数のバイト列を連結した SHA-256 を16進文字列で返す。
pub fn fingerprint_bytes(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// 描画パラメータを正規化JSON形式に変換する（キーはアルファベット順で固定）。
fn render_params_to_canonical_json(page_index: u32, scale: f32) -> String {
    let mut map = BTreeMap::new();
    map.insert("page_index", serde_json::json!(page_index));
    map.insert("scale_bits", serde_json::json!(scale.to_bits()));
    serde_json::Value::from_iter(map.into_iter().map(|(k, v)| (k.to_string(), v))).to_string()
}

/// ページキャッシュのキーを計算する。
///
/// ハッシュ入力: `fingerprint || render_params_canonical_json`
/// スケールを含めることで、キャッシュヒットが常に現在のスケールと一致する。
pub fn compute_page_key(fingerprint: &str, page_index: u32, scale: f32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(render_params_to_canonical_json(page_index, scale).as_bytes());
    hex::encode(hasher.finalize())
}
