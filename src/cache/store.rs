// メモリ内ページキャッシュ: hash → PageBitmap
//
// Holds recently rendered pages keyed by SHA-256 page keys. Eviction is
// first-in first-out once capacity is reached.

use std::collections::{HashMap, VecDeque};

use crate::render::PageBitmap;

/// キャッシュキーが有効な SHA-256 hex 文字列であるかを判定する。
fn is_valid_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// 容量制限付きのページキャッシュ。容量0はキャッシュ無効を意味する。
pub struct PageCache {
    capacity: usize,
    entries: HashMap<String, PageBitmap>,
    order: VecDeque<String>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<PageBitmap> {
        self.entries.get(key).cloned()
    }

    /// ページを保存する。不正なキーと容量0の場合は何もしない。
    pub fn insert(&mut self, key: String, bitmap: PageBitmap) {
        if self.capacity == 0 || !is_valid_key(&key) {
            return;
        }
        if self.entries.insert(key.clone(), bitmap).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
