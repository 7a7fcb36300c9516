//! 語法顏色設定
//!
//! 每個顏色分類對應一個可設定的顯示顏色。設定流程開始時呼叫
//! `snapshot()`，取消時 `restore()` 回到快照，確認時再寫入偏好設定。

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 顏色分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorClass {
    Unassigned = 0,
    Graphics = 1,
    Math = 2,
    Define = 3,
    FlowControl = 4,
    Numbers = 5,
    Comment = 6,
}

impl ColorClass {
    pub const ALL: [ColorClass; 7] = [
        ColorClass::Unassigned,
        ColorClass::Graphics,
        ColorClass::Math,
        ColorClass::Define,
        ColorClass::FlowControl,
        ColorClass::Numbers,
        ColorClass::Comment,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 偏好設定中使用的鍵名
    pub fn key(self) -> &'static str {
        match self {
            ColorClass::Unassigned => "UnassignedColor",
            ColorClass::Graphics => "GraphicsColor",
            ColorClass::Math => "MathColor",
            ColorClass::Define => "DefineColor",
            ColorClass::FlowControl => "FlowControlColor",
            ColorClass::Numbers => "NumbersColor",
            ColorClass::Comment => "CommentColor",
        }
    }

    /// 接受鍵名（`GraphicsColor`）或簡稱（`graphics`），不分大小寫
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        let key = key.strip_suffix("color").unwrap_or(&key);
        Self::ALL.into_iter().find(|class| {
            let name = class.key().to_ascii_lowercase();
            name.strip_suffix("color") == Some(key)
        })
    }

    /// 出廠預設顏色
    pub fn default_color(self) -> Rgb {
        match self {
            ColorClass::Unassigned => Rgb::new(0, 0, 0),
            ColorClass::Graphics => Rgb::new(0, 0, 255),
            ColorClass::Math => Rgb::new(255, 0, 255),
            ColorClass::Define => Rgb::from_unit(0.2, 0.5, 0.2),
            ColorClass::FlowControl => Rgb::new(255, 0, 0),
            ColorClass::Numbers => Rgb::from_unit(0.2, 0.8, 0.8),
            ColorClass::Comment => Rgb::from_unit(0.6, 0.4, 0.2),
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key().trim_end_matches("Color"))
    }
}

/// 24-bit 顏色，序列化為 `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 由 0.0..=1.0 的分量建立
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(r), channel(g), channel(b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("Invalid color '{}', expected #rrggbb", s);
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).with_context(|| format!("Invalid color '{}'", s))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// 語法顏色表（取代全域狀態，由呼叫者持有並傳遞）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxColors {
    colors: [Rgb; 7],
    undo_colors: [Rgb; 7],
}

impl SyntaxColors {
    pub fn new() -> Self {
        let defaults = Self::defaults();
        Self {
            colors: defaults,
            undo_colors: defaults,
        }
    }

    fn defaults() -> [Rgb; 7] {
        ColorClass::ALL.map(ColorClass::default_color)
    }

    pub fn color(&self, class: ColorClass) -> Rgb {
        self.colors[class.index()]
    }

    /// 設定單一分類的顏色（尚未寫入快照）
    pub fn apply(&mut self, class: ColorClass, color: Rgb) {
        self.colors[class.index()] = color;
    }

    /// 記錄目前顏色，供之後 `restore()`
    pub fn snapshot(&mut self) {
        self.undo_colors = self.colors;
    }

    /// 回到最後一次 `snapshot()` 的顏色
    pub fn restore(&mut self) {
        self.colors = self.undo_colors;
    }

    /// 恢復出廠預設
    pub fn reset(&mut self) {
        self.colors = Self::defaults();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorClass, Rgb)> + '_ {
        ColorClass::ALL
            .into_iter()
            .map(move |class| (class, self.color(class)))
    }
}

impl Default for SyntaxColors {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_colors() {
        let colors = SyntaxColors::new();
        assert_eq!(colors.color(ColorClass::Graphics), Rgb::new(0, 0, 255));
        assert_eq!(colors.color(ColorClass::Define), Rgb::new(51, 128, 51));
        assert_eq!(colors.color(ColorClass::Numbers), Rgb::new(51, 204, 204));
        assert_eq!(colors.iter().count(), 7);
    }

    #[test]
    fn test_cancel_reverts_to_snapshot() {
        let mut colors = SyntaxColors::new();
        colors.apply(ColorClass::Math, Rgb::new(1, 2, 3));
        colors.snapshot();

        colors.apply(ColorClass::Math, Rgb::new(9, 9, 9));
        colors.apply(ColorClass::Comment, Rgb::new(8, 8, 8));
        colors.restore();

        assert_eq!(colors.color(ColorClass::Math), Rgb::new(1, 2, 3));
        assert_eq!(
            colors.color(ColorClass::Comment),
            ColorClass::Comment.default_color()
        );
    }

    #[test]
    fn test_reset_keeps_snapshot() {
        let mut colors = SyntaxColors::new();
        colors.apply(ColorClass::Graphics, Rgb::new(10, 20, 30));
        colors.snapshot();
        colors.reset();
        assert_eq!(colors.color(ColorClass::Graphics), Rgb::new(0, 0, 255));

        colors.restore();
        assert_eq!(colors.color(ColorClass::Graphics), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_rgb_parse_and_display() {
        let color: Rgb = "#33cc80".parse().unwrap();
        assert_eq!(color, Rgb::new(0x33, 0xcc, 0x80));
        assert_eq!(color.to_string(), "#33cc80");
        assert_eq!("FF0000".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_class_keys() {
        assert_eq!(ColorClass::from_key("GraphicsColor"), Some(ColorClass::Graphics));
        assert_eq!(ColorClass::from_key("flowcontrol"), Some(ColorClass::FlowControl));
        assert_eq!(ColorClass::from_key(" Comment "), Some(ColorClass::Comment));
        assert_eq!(ColorClass::from_key("strings"), None);
        assert_eq!(ColorClass::Numbers.to_string(), "Numbers");
    }
}
