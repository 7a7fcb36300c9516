//! 單行分詞與分類
//!
//! 一行會被切成「程式碼」與「註解」兩段；行首的 `/name` 定義先被取出，
//! 其餘部分以空白與括號切成 token，再交給 [`classify`] 分類。
//! 回傳的範圍是以字元計算、並已加上行首在整份文件中的偏移量。

use super::colors::ColorClass;
use super::rules::classify;
use once_cell::sync::Lazy;
use regex::Regex;

/// token 分隔字元
pub const DELIMITERS: [char; 6] = [' ', '(', ')', '\t', '\r', '\n'];

/// 行首（可有前導空白）的名稱定義，如 `/Times-Bold`
static NAME_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*?(/\S+)").expect("name definition pattern is valid"));

/// 一段已分類的文字，`start..end` 為文件中的字元位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSpan {
    pub start: usize,
    pub end: usize,
    pub class: ColorClass,
}

impl ColorSpan {
    pub fn new(start: usize, end: usize, class: ColorClass) -> Self {
        Self { start, end, class }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 找出第一個未跳脫的 `%`（位元組位置）
pub fn comment_start(line: &str) -> Option<usize> {
    let mut previous = None;
    for (idx, ch) in line.char_indices() {
        if ch == '%' && previous != Some('\\') {
            return Some(idx);
        }
        previous = Some(ch);
    }
    None
}

/// 分詞並分類一行文字（不含換行符）
///
/// `offset` 是此行第一個字元在整份文件中的字元位置。
pub fn tokenize_line(line: &str, offset: usize) -> Vec<ColorSpan> {
    let mut spans = Vec::new();

    let split = comment_start(line).unwrap_or(line.len());
    let (code, comment) = line.split_at(split);

    // 行首定義整段上色，不再參與後面的分詞
    let mut resume = 0;
    if let Some(name) = NAME_DEFINITION.captures(code).and_then(|caps| caps.get(1)) {
        let start = offset + char_count(&code[..name.start()]);
        let end = start + char_count(name.as_str());
        spans.push(ColorSpan::new(start, end, ColorClass::Define));
        resume = name.end();
    }

    let resume_chars = char_count(&code[..resume]);
    for token in Tokens::new(&code[resume..]) {
        if let Some(class) = classify(token.text) {
            spans.push(ColorSpan::new(
                offset + resume_chars + token.start,
                offset + resume_chars + token.end,
                class,
            ));
        }
    }

    if !comment.is_empty() {
        let start = offset + char_count(code);
        spans.push(ColorSpan::new(
            start,
            start + char_count(comment),
            ColorClass::Comment,
        ));
    }

    spans
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// 以 [`DELIMITERS`] 切出的一個 token（字元位置相對於輸入字串）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

struct Tokens<'a> {
    text: &'a str,
    chars: std::iter::Enumerate<std::str::CharIndices<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().enumerate(),
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        // (字元位置, 位元組位置)
        let mut begin: Option<(usize, usize)> = None;

        for (char_idx, (byte_idx, ch)) in self.chars.by_ref() {
            let is_delimiter = DELIMITERS.contains(&ch);
            match (begin, is_delimiter) {
                (None, false) => begin = Some((char_idx, byte_idx)),
                (Some((start, byte_start)), true) => {
                    return Some(Token {
                        text: &self.text[byte_start..byte_idx],
                        start,
                        end: char_idx,
                    });
                }
                _ => {}
            }
        }

        begin.map(|(start, byte_start)| {
            let text = &self.text[byte_start..];
            Token {
                text,
                start,
                end: start + char_count(text),
            }
        })
    }
}
