//! ANSI 色碼輸出
//!
//! 把已分類的文字轉成終端色碼（`--highlight` 與非互動輸出使用）。
//! 只在顏色變化時輸出色碼，行尾的換行符不會被包在色碼裡。

use super::attributes::ColorAttributes;
use super::colors::{ColorClass, Rgb, SyntaxColors};
use super::recolor::{line_range, recolor_all, strip_line_ending, RecolorOutcome};
use ropey::Rope;
use std::fmt::Write;

const RESET: &str = "\x1b[0m";
const DEFAULT_FOREGROUND: &str = "\x1b[39m";

/// 把一行文字依照字元分類上色
///
/// `classes` 與 `line` 的字元一一對應；多出或不足的部分視為未上色。
pub fn render_line(
    line: &str,
    classes: &[Option<ColorClass>],
    colors: &SyntaxColors,
    true_color: bool,
) -> String {
    let line = strip_line_ending(line);
    let mut output = String::with_capacity(line.len() + 32);
    // None = 尚未輸出任何色碼；Some(None) = 目前是預設前景色
    let mut current: Option<Option<Rgb>> = None;
    let mut colored = false;

    for (idx, ch) in line.chars().enumerate() {
        let fg = classes
            .get(idx)
            .copied()
            .flatten()
            .map(|class| colors.color(class));

        if current != Some(fg) {
            match fg {
                Some(rgb) => {
                    push_color(&mut output, rgb, true_color);
                    colored = true;
                }
                // 開頭的未上色文字不需要色碼
                None if current.is_some() => output.push_str(DEFAULT_FOREGROUND),
                None => {}
            }
            current = Some(fg);
        }

        output.push(ch);
    }

    if colored {
        output.push_str(RESET);
    }

    output
}

fn push_color(output: &mut String, rgb: Rgb, true_color: bool) {
    if true_color {
        let _ = write!(output, "\x1b[38;2;{};{};{}m", rgb.r, rgb.g, rgb.b);
    } else {
        let code = ansi_colours::ansi256_from_rgb((rgb.r, rgb.g, rgb.b));
        let _ = write!(output, "\x1b[38;5;{}m", code);
    }
}

/// 整份文件上色並輸出；超過 `limit` 時原樣輸出
pub fn highlight_document(
    text: &str,
    colors: &SyntaxColors,
    true_color: bool,
    limit: usize,
) -> String {
    let rope = Rope::from_str(text);
    let mut attrs = ColorAttributes::new();
    if let RecolorOutcome::SkippedTooLarge { .. } = recolor_all(&rope, &mut attrs, limit) {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len() * 2);
    for (idx, line) in rope.lines().enumerate() {
        let line = line.to_string();
        let range = line_range(&rope, idx);
        output.push_str(&render_line(&line, attrs.slice(range), colors, true_color));

        // 保留原本的換行符
        let content = strip_line_ending(&line);
        output.push_str(&line[content.len()..]);
    }
    output
}

/// 檢測終端是否支援 24-bit 真彩色
///
/// 檢測策略：
/// 1. 檢查 COLORTERM 環境變數
/// 2. 檢查 TERM 環境變數
/// 3. Windows Terminal
pub fn supports_true_color() -> bool {
    if let Ok(colorterm) = std::env::var("COLORTERM") {
        if colorterm == "truecolor" || colorterm == "24bit" {
            return true;
        }
    }

    if let Ok(term) = std::env::var("TERM") {
        if term.contains("24bit") || term.contains("truecolor") {
            return true;
        }
        if term.contains("iterm") || term.contains("konsole") {
            return true;
        }
    }

    if cfg!(windows) && std::env::var("WT_SESSION").is_ok() {
        return true;
    }

    // 預設：降級為 256 色
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize_line;

    fn classes_of(line: &str) -> Vec<Option<ColorClass>> {
        let mut attrs = ColorAttributes::uncolored(line.chars().count());
        attrs.apply_all(&tokenize_line(line, 0));
        attrs.slice(0..attrs.len()).to_vec()
    }

    #[test]
    fn test_plain_line_has_no_escape_codes() {
        let line = "(hello) foo bar";
        let result = render_line(line, &classes_of(line), &SyntaxColors::new(), true);
        assert_eq!(result, line);
    }

    #[test]
    fn test_true_color_output() {
        let line = "72 moveto";
        let result = render_line(line, &classes_of(line), &SyntaxColors::new(), true);
        assert!(result.starts_with("\x1b[38;2;51;204;204m72"));
        assert!(result.contains("\x1b[39m \x1b[38;2;0;0;255mmoveto"));
        assert!(result.ends_with(RESET));
        assert_eq!(result.matches(RESET).count(), 1);
    }

    #[test]
    fn test_256_color_mode() {
        let line = "1 2 add";
        let result = render_line(line, &classes_of(line), &SyntaxColors::new(), false);
        assert!(result.contains("\x1b[38;5;"));
        assert!(!result.contains("\x1b[38;2;"));
    }

    #[test]
    fn test_same_color_is_emitted_once() {
        let mut colors = SyntaxColors::new();
        colors.apply(ColorClass::Math, colors.color(ColorClass::Numbers));
        let line = "1 add";
        let classes = vec![Some(ColorClass::Numbers); 5];
        let result = render_line(line, &classes, &colors, true);
        assert_eq!(result.matches("\x1b[38;2;").count(), 1);
    }

    #[test]
    fn test_no_newline_inside_colors() {
        let result = render_line("% note\r\n", &classes_of("% note"), &SyntaxColors::new(), true);
        assert!(!result.contains('\n'));
        assert!(!result.contains('\r'));
    }

    #[test]
    fn test_highlight_document_keeps_line_endings() {
        let text = "%!PS\r\n1 2 add\nshowpage\n";
        let result = highlight_document(text, &SyntaxColors::new(), true, usize::MAX);
        assert_eq!(result.matches("\r\n").count(), 1);
        assert_eq!(result.matches('\n').count(), 3);
        assert!(result.contains("showpage"));
    }

    #[test]
    fn test_highlight_document_over_limit_is_plain() {
        let text = "1 2 add\n";
        assert_eq!(highlight_document(text, &SyntaxColors::new(), true, 3), text);
    }
}
