//! 文件的前景色屬性
//!
//! 每個字元一個 `Option<ColorClass>`。編輯時先 [`ColorAttributes::splice`]
//! 讓其他行的屬性跟著位移，再只重新分類被編輯的行。

use super::colors::ColorClass;
use super::tokenizer::ColorSpan;
use crate::buffer::Edit;
use std::ops::Range;

/// 一段連續相同屬性的字元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRun {
    pub range: Range<usize>,
    pub class: Option<ColorClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorAttributes {
    classes: Vec<Option<ColorClass>>,
}

impl ColorAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立長度為 `len`、全部未上色的屬性表
    pub fn uncolored(len: usize) -> Self {
        Self {
            classes: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_at(&self, idx: usize) -> Option<ColorClass> {
        self.classes.get(idx).copied().flatten()
    }

    pub fn slice(&self, range: Range<usize>) -> &[Option<ColorClass>] {
        let range = self.clamp(range);
        &self.classes[range]
    }

    /// 全部清除並調整為 `len` 個字元
    pub fn reset(&mut self, len: usize) {
        self.classes.clear();
        self.classes.resize(len, None);
    }

    /// 移除範圍內的前景色
    pub fn clear(&mut self, range: Range<usize>) {
        let range = self.clamp(range);
        self.classes[range].fill(None);
    }

    pub fn apply(&mut self, span: &ColorSpan) {
        let range = self.clamp(span.start..span.end);
        self.classes[range].fill(Some(span.class));
    }

    pub fn apply_all(&mut self, spans: &[ColorSpan]) {
        for span in spans {
            self.apply(span);
        }
    }

    /// 依照文字編輯同步屬性：刪除的字元帶走屬性，插入的字元未上色
    pub fn splice(&mut self, edit: &Edit) {
        let start = edit.start.min(self.classes.len());
        let end = (edit.start + edit.removed).min(self.classes.len());
        self.classes
            .splice(start..end, std::iter::repeat(None).take(edit.inserted));
    }

    /// 將範圍切成連續相同屬性的片段（渲染用）
    pub fn runs(&self, range: Range<usize>) -> Vec<ColorRun> {
        let range = self.clamp(range);
        let mut runs: Vec<ColorRun> = Vec::new();

        for idx in range {
            let class = self.classes[idx];
            match runs.last_mut() {
                Some(run) if run.class == class => run.range.end = idx + 1,
                _ => runs.push(ColorRun {
                    range: idx..idx + 1,
                    class,
                }),
            }
        }

        runs
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.classes.len());
        range.start.min(end)..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_clear() {
        let mut attrs = ColorAttributes::uncolored(10);
        attrs.apply(&ColorSpan::new(2, 5, ColorClass::Math));
        assert_eq!(attrs.class_at(1), None);
        assert_eq!(attrs.class_at(2), Some(ColorClass::Math));
        assert_eq!(attrs.class_at(4), Some(ColorClass::Math));
        assert_eq!(attrs.class_at(5), None);

        attrs.clear(3..10);
        assert_eq!(attrs.class_at(2), Some(ColorClass::Math));
        assert_eq!(attrs.class_at(3), None);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut attrs = ColorAttributes::uncolored(4);
        attrs.apply(&ColorSpan::new(2, 40, ColorClass::Comment));
        attrs.clear(8..12);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs.class_at(3), Some(ColorClass::Comment));
        assert_eq!(attrs.class_at(99), None);
        assert!(attrs.slice(6..9).is_empty());
    }

    #[test]
    fn test_splice_shifts_following_attributes() {
        let mut attrs = ColorAttributes::uncolored(6);
        attrs.apply(&ColorSpan::new(4, 6, ColorClass::Numbers));

        // 在位置 1 插入 3 個字元
        attrs.splice(&Edit {
            start: 1,
            removed: 0,
            inserted: 3,
        });
        assert_eq!(attrs.len(), 9);
        assert_eq!(attrs.class_at(7), Some(ColorClass::Numbers));
        assert_eq!(attrs.class_at(8), Some(ColorClass::Numbers));

        // 刪除位置 0..2
        attrs.splice(&Edit {
            start: 0,
            removed: 2,
            inserted: 0,
        });
        assert_eq!(attrs.len(), 7);
        assert_eq!(attrs.class_at(5), Some(ColorClass::Numbers));
    }

    #[test]
    fn test_runs() {
        let mut attrs = ColorAttributes::uncolored(8);
        attrs.apply(&ColorSpan::new(0, 2, ColorClass::Numbers));
        attrs.apply(&ColorSpan::new(5, 8, ColorClass::Graphics));

        let runs = attrs.runs(1..8);
        assert_eq!(
            runs,
            vec![
                ColorRun {
                    range: 1..2,
                    class: Some(ColorClass::Numbers)
                },
                ColorRun {
                    range: 2..5,
                    class: None
                },
                ColorRun {
                    range: 5..8,
                    class: Some(ColorClass::Graphics)
                },
            ]
        );
    }
}
