//! PostScript 關鍵字表與分類規則
//!
//! 分類是一串依序比對的規則，第一個命中的規則決定顏色。
//! 數字字面值排在最前面，所以數字永遠不會被關鍵字表覆蓋。

use super::colors::ColorClass;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const GRAPHICS_OPERATORS: &[&str] = &[
    "get", "moveto", "lineto", "rmoveto", "rlineto", "newpath", "closepath", "stroke", "show",
    "showpage", "gsave", "grestore", "scale", "translate", "rotate", "setlinewidth", "push",
    "pop", "dup", "exch", "copy", "index", "roll", "clear", "mark", "cleartomark",
    "counttomark", "findfont", "scalefont", "setfont", "charpath", "selectfont", "stringwidth",
    "setgray", "fill", "setrgbcolor", "length", "putinterval", "bind", "cvs", "cvi", "cvn",
];

pub const MATH_OPERATORS: &[&str] = &[
    "add", "div", "idiv", "mod", "mul", "sub", "abs", "neg", "ceiling", "floor", "round",
    "truncate", "sqrt", "atan", "cos", "sin", "sinus", "exp", "ln", "rand", "srand", "rrand",
];

pub const FLOW_CONTROL_OPERATORS: &[&str] = &[
    "exec",
    "if",
    "ifelse",
    "for",
    "forall",
    "repeat",
    "loop",
    "exit",
    "start",
    "stop",
    "stopped",
    "countexecstack",
    "execstack",
    "quit",
];

pub const DEFINE_OPERATORS: &[&str] = &["def"];

static GRAPHICS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| GRAPHICS_OPERATORS.iter().copied().collect());
static MATH: Lazy<HashSet<&'static str>> = Lazy::new(|| MATH_OPERATORS.iter().copied().collect());
static FLOW_CONTROL: Lazy<HashSet<&'static str>> =
    Lazy::new(|| FLOW_CONTROL_OPERATORS.iter().copied().collect());
static DEFINE: Lazy<HashSet<&'static str>> =
    Lazy::new(|| DEFINE_OPERATORS.iter().copied().collect());

/// 數字字面值：帶號整數/小數/指數、`基數#數字`、`true`/`false`，不分大小寫
static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[+-]?[0-9]+(?:\.[0-9]+)?(?:e[+-]?[0-9]+)?|[0-9]+#[0-9a-z]+|true|false)$",
    )
    .expect("numeric literal pattern is valid")
});

/// 單一分類規則
pub struct Rule {
    pub name: &'static str,
    pub class: ColorClass,
    matches: fn(&str) -> bool,
}

impl Rule {
    pub fn apply(&self, token: &str) -> Option<ColorClass> {
        (self.matches)(token).then_some(self.class)
    }
}

/// 依優先順序排列的規則表；新增運算子只需擴充上面的表
pub static RULES: [Rule; 5] = [
    Rule {
        name: "numeric literal",
        class: ColorClass::Numbers,
        matches: is_numeric_literal,
    },
    Rule {
        name: "graphics operator",
        class: ColorClass::Graphics,
        matches: is_graphics_operator,
    },
    Rule {
        name: "math operator",
        class: ColorClass::Math,
        matches: is_math_operator,
    },
    Rule {
        name: "flow control operator",
        class: ColorClass::FlowControl,
        matches: is_flow_control_operator,
    },
    Rule {
        name: "define",
        class: ColorClass::Define,
        matches: is_define_operator,
    },
];

/// 分類單一 token；沒有規則命中時回傳 `None`（不上色）
pub fn classify(token: &str) -> Option<ColorClass> {
    RULES.iter().find_map(|rule| rule.apply(token))
}

pub fn is_numeric_literal(token: &str) -> bool {
    NUMERIC_LITERAL.is_match(token)
}

fn is_graphics_operator(token: &str) -> bool {
    GRAPHICS.contains(token)
}

fn is_math_operator(token: &str) -> bool {
    MATH.contains(token)
}

fn is_flow_control_operator(token: &str) -> bool {
    FLOW_CONTROL.contains(token)
}

fn is_define_operator(token: &str) -> bool {
    DEFINE.contains(token)
}
