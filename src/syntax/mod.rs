// PostScript 語法上色

mod ansi;
mod attributes;
mod colors;
mod recolor;
mod rules;
mod tokenizer;

pub use ansi::{highlight_document, render_line, supports_true_color};
pub use attributes::{ColorAttributes, ColorRun};
pub use colors::{ColorClass, Rgb, SyntaxColors};
pub use recolor::{
    line_range, recolor_all, recolor_edit, recolor_line, recolor_lines, strip_line_ending,
    RecolorOutcome, DEFAULT_FULL_RECOLOR_LIMIT,
};
pub use rules::{
    classify, is_numeric_literal, Rule, DEFINE_OPERATORS, FLOW_CONTROL_OPERATORS,
    GRAPHICS_OPERATORS, MATH_OPERATORS, RULES,
};
pub use tokenizer::{comment_start, tokenize_line, ColorSpan, DELIMITERS};
