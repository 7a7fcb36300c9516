//! 增量重新上色
//!
//! 編輯後只重算被碰到的行；開檔、還原、新檔時才對整份文件上色，
//! 文件太大時整份跳過以維持互動速度。

use super::attributes::ColorAttributes;
use super::tokenizer::tokenize_line;
use crate::buffer::Edit;
use ropey::Rope;
use std::ops::{Range, RangeInclusive};

/// 整份上色的預設字元上限
pub const DEFAULT_FULL_RECOLOR_LIMIT: usize = 250_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecolorOutcome {
    Colored { lines: usize },
    SkippedTooLarge { len: usize, limit: usize },
}

/// 行的完整字元範圍（包含換行符）
pub fn line_range(text: &Rope, line: usize) -> Range<usize> {
    let line = line.min(text.len_lines().saturating_sub(1));
    let start = text.line_to_char(line);
    let end = if line + 1 < text.len_lines() {
        text.line_to_char(line + 1)
    } else {
        text.len_chars()
    };
    start..end
}

/// 移除行尾的換行符（\n、\r\n、\r 及其他 Unicode 斷行）
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(|c| {
        matches!(
            c,
            '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
        )
    })
}

/// 重新上色單一行：先清除整行（含換行符）的前景色，再套用分類結果
pub fn recolor_line(text: &Rope, attrs: &mut ColorAttributes, line: usize) {
    if line >= text.len_lines() {
        return;
    }
    let range = line_range(text, line);
    attrs.clear(range.clone());

    let content = text.line(line).to_string();
    let spans = tokenize_line(strip_line_ending(&content), range.start);
    attrs.apply_all(&spans);
}

pub fn recolor_lines(text: &Rope, attrs: &mut ColorAttributes, lines: RangeInclusive<usize>) {
    for line in lines {
        recolor_line(text, attrs, line);
    }
}

/// 套用一次編輯：位移屬性並重新上色被碰到的行，回傳重新上色的行範圍
pub fn recolor_edit(
    text: &Rope,
    attrs: &mut ColorAttributes,
    edit: &Edit,
) -> RangeInclusive<usize> {
    attrs.splice(edit);

    let len = text.len_chars();
    let first = text.char_to_line(edit.start.min(len));
    let last = text.char_to_line((edit.start + edit.inserted).min(len));
    recolor_lines(text, attrs, first..=last);
    first..=last
}

/// 整份文件上色；超過 `limit` 個字元時保持未上色
pub fn recolor_all(text: &Rope, attrs: &mut ColorAttributes, limit: usize) -> RecolorOutcome {
    let len = text.len_chars();
    attrs.reset(len);

    if len > limit {
        log::info!(
            "Document has {} characters, skipping syntax colors (limit {})",
            len,
            limit
        );
        return RecolorOutcome::SkippedTooLarge { len, limit };
    }

    let lines = text.len_lines();
    for line in 0..lines {
        recolor_line(text, attrs, line);
    }
    RecolorOutcome::Colored { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ColorClass;

    const SAMPLE: &str = "%!PS\n\n/test 7 8 9.0 add add def\r\n72 684 moveto (Hi) show % draw\nshowpage";

    fn full(text: &Rope) -> ColorAttributes {
        let mut attrs = ColorAttributes::new();
        recolor_all(text, &mut attrs, usize::MAX);
        attrs
    }

    /// 模擬編輯器：改 rope、位移屬性、只重畫碰到的行
    fn edit(text: &mut Rope, attrs: &mut ColorAttributes, start: usize, removed: usize, insert: &str) {
        text.remove(start..start + removed);
        text.insert(start, insert);
        recolor_edit(
            text,
            attrs,
            &Edit {
                start,
                removed,
                inserted: insert.chars().count(),
            },
        );
    }

    #[test]
    fn test_full_recolor() {
        let text = Rope::from_str(SAMPLE);
        let attrs = full(&text);
        assert_eq!(attrs.len(), text.len_chars());
        assert_eq!(attrs.class_at(0), Some(ColorClass::Comment));
        let moveto = SAMPLE.find("moveto").unwrap();
        assert_eq!(attrs.class_at(moveto), Some(ColorClass::Graphics));
        // 換行符本身沒有顏色
        assert_eq!(attrs.class_at(4), None);
    }

    #[test]
    fn test_incremental_matches_full_recolor() {
        let mut text = Rope::from_str(SAMPLE);
        let mut attrs = full(&text);

        edit(&mut text, &mut attrs, 6, 0, "1 ");
        assert_eq!(attrs, full(&text));

        // 把定義改成註解
        edit(&mut text, &mut attrs, 6, 0, "% ");
        assert_eq!(attrs, full(&text));

        // 刪掉換行，兩行合併
        let newline = text.to_string().find("def").unwrap() + 3;
        edit(&mut text, &mut attrs, newline, 2, " ");
        assert_eq!(attrs, full(&text));

        // 多行貼上
        edit(&mut text, &mut attrs, 0, 0, "1 2 add\n/x 3 def\nstroke ");
        assert_eq!(attrs, full(&text));

        // 刪除到文件末尾
        let len = text.len_chars();
        edit(&mut text, &mut attrs, len - 4, 4, "");
        assert_eq!(attrs, full(&text));
    }

    #[test]
    fn test_edit_leaves_other_lines_untouched() {
        let mut text = Rope::from_str("1 add\n2 sub\n3 mul\n");
        let mut attrs = full(&text);
        let before_last = attrs.slice(line_range(&text, 2)).to_vec();

        edit(&mut text, &mut attrs, 8, 3, "moveto");
        let after_last = attrs.slice(line_range(&text, 2)).to_vec();
        assert_eq!(before_last, after_last);
        assert_eq!(attrs.class_at(8), Some(ColorClass::Graphics));
    }

    #[test]
    fn test_recolor_line_is_idempotent() {
        let text = Rope::from_str(SAMPLE);
        let mut attrs = full(&text);
        recolor_line(&text, &mut attrs, 3);
        let first = attrs.clone();
        recolor_line(&text, &mut attrs, 3);
        assert_eq!(first, attrs);
        assert_eq!(attrs, full(&text));
    }

    #[test]
    fn test_large_document_is_skipped() {
        let text = Rope::from_str("1 2 add\n");
        let mut attrs = ColorAttributes::uncolored(3);
        let outcome = recolor_all(&text, &mut attrs, 4);
        assert_eq!(
            outcome,
            RecolorOutcome::SkippedTooLarge { len: 8, limit: 4 }
        );
        assert_eq!(attrs.len(), 8);
        assert!((0..8).all(|idx| attrs.class_at(idx).is_none()));
    }

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("abc\n"), "abc");
        assert_eq!(strip_line_ending("abc\r\n"), "abc");
        assert_eq!(strip_line_ending("abc\r"), "abc");
        assert_eq!(strip_line_ending("abc"), "abc");
        assert_eq!(strip_line_ending(""), "");
    }
}
