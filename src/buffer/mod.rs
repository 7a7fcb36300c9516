mod document;
mod history;

pub use document::{Document, FileRef, TextEncoding, TEMPLATE, UNTITLED_NAME};
pub use history::{Action, History};

/// 一次文字編輯（以字元計算），用來位移顏色屬性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl Edit {
    /// 編輯後插入文字的結束位置
    pub fn end(&self) -> usize {
        self.start + self.inserted
    }
}
