use crate::buffer::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,         // 邏輯行號 (0-based)
    pub col: usize,         // 邏輯列號 (0-based，字元)
    pub desired_col: usize, // 上下移動時保持的列
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            desired_col: 0,
        }
    }

    pub fn move_up(&mut self, doc: &Document) {
        if self.row > 0 {
            self.row -= 1;
            self.adjust_col_to_desired(doc);
        }
    }

    pub fn move_down(&mut self, doc: &Document) {
        if self.row + 1 < doc.line_count() {
            self.row += 1;
            self.adjust_col_to_desired(doc);
        }
    }

    pub fn move_left(&mut self, doc: &Document) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            // 移動到上一行末尾
            self.row -= 1;
            self.col = doc.line_len(self.row);
        }
        self.desired_col = self.col;
    }

    pub fn move_right(&mut self, doc: &Document) {
        if self.col < doc.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < doc.line_count() {
            // 移動到下一行開頭
            self.row += 1;
            self.col = 0;
        }
        self.desired_col = self.col;
    }

    pub fn move_to_line_start(&mut self) {
        self.col = 0;
        self.desired_col = 0;
    }

    pub fn move_to_line_end(&mut self, doc: &Document) {
        self.col = doc.line_len(self.row);
        self.desired_col = self.col;
    }

    pub fn move_page_up(&mut self, doc: &Document, page_size: usize) {
        self.row = self.row.saturating_sub(page_size);
        self.adjust_col_to_desired(doc);
    }

    pub fn move_page_down(&mut self, doc: &Document, page_size: usize) {
        let max_row = doc.line_count().saturating_sub(1);
        self.row = (self.row + page_size).min(max_row);
        self.adjust_col_to_desired(doc);
    }

    pub fn move_to_start(&mut self) {
        *self = Self::new();
    }

    pub fn move_to_end(&mut self, doc: &Document) {
        self.row = doc.line_count().saturating_sub(1);
        self.move_to_line_end(doc);
    }

    /// 獲取光標在文本中的絕對字符位置
    pub fn char_position(&self, doc: &Document) -> usize {
        doc.line_to_char(self.row) + self.col
    }

    /// 把光標放到絕對字符位置（編輯、撤銷後使用）
    pub fn set_position(&mut self, doc: &Document, pos: usize) {
        let pos = pos.min(doc.len_chars());
        self.row = doc.char_to_line(pos);
        self.col = (pos - doc.line_to_char(self.row)).min(doc.line_len(self.row));
        self.desired_col = self.col;
    }

    /// 文件內容被整個替換後，確保光標仍在範圍內
    pub fn clamp(&mut self, doc: &Document) {
        self.row = self.row.min(doc.line_count().saturating_sub(1));
        self.col = self.col.min(doc.line_len(self.row));
        self.desired_col = self.col;
    }

    /// 調整列位置到期望的列，確保不超出行長度
    fn adjust_col_to_desired(&mut self, doc: &Document) {
        self.col = self.desired_col.min(doc.line_len(self.row));
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
