// 偏好設定（JSON）

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::Converter;
use crate::syntax::{ColorClass, Rgb, SyntaxColors, DEFAULT_FULL_RECOLOR_LIMIT};

pub const PREFS_VERSION: &str = "1.0.3";
pub const MAX_RECENT: usize = 10;

/// 最近開啟的檔案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentItem {
    pub ps_path: PathBuf,
    pub pdf_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub version: String,
    pub converter_path: Option<PathBuf>,
    pub converter_argument: String,
    pub converter_timeout_secs: Option<u64>,
    pub pdf_viewer: Option<String>,
    pub highlight_limit: usize,
    pub colors: BTreeMap<String, Rgb>,
    pub recent: Vec<RecentItem>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFS_VERSION.to_string(),
            converter_path: None,
            converter_argument: String::new(),
            converter_timeout_secs: None,
            pdf_viewer: None,
            highlight_limit: DEFAULT_FULL_RECOLOR_LIMIT,
            colors: BTreeMap::new(),
            recent: Vec::new(),
        }
    }
}

impl Preferences {
    /// 讀取偏好設定；檔案不存在或無法解析時使用預設值
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No preferences at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read preferences: {}", path.display()))
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(prefs) => {
                if prefs.version != PREFS_VERSION {
                    log::info!(
                        "Preferences version {} differs from {}",
                        prefs.version,
                        PREFS_VERSION
                    );
                }
                Ok(prefs)
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable preferences {}: {}",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to encode preferences")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write preferences: {}", path.display()))?;
        log::debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// `$PSPLAY_PREFS`，否則 `$XDG_CONFIG_HOME/psplay/preferences.json`
    /// 或 `$HOME/.config/psplay/preferences.json`
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os("PSPLAY_PREFS") {
            return PathBuf::from(path);
        }
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        config_home.join("psplay").join("preferences.json")
    }

    /// 偏好設定中的顏色；缺少的分類使用出廠預設
    pub fn syntax_colors(&self) -> SyntaxColors {
        let mut colors = SyntaxColors::new();
        for (key, color) in &self.colors {
            match ColorClass::from_key(key) {
                Some(class) => colors.apply(class, *color),
                None => log::warn!("Unknown color class '{}' in preferences", key),
            }
        }
        colors.snapshot();
        colors
    }

    pub fn store_colors(&mut self, colors: &SyntaxColors) {
        self.colors = colors
            .iter()
            .map(|(class, color)| (class.key().to_string(), color))
            .collect();
    }

    /// 設定的轉換程式；未設定時尋找常見位置
    pub fn converter(&self) -> Option<Converter> {
        let converter = match &self.converter_path {
            Some(path) => Some(Converter::new(path, self.converter_argument.clone())),
            None => Converter::discover(),
        };
        converter.map(|c| c.with_timeout(self.converter_timeout_secs.map(Duration::from_secs)))
    }

    pub fn set_converter(&mut self, path: PathBuf, argument: String) {
        self.converter_path = Some(path);
        self.converter_argument = argument;
    }

    /// 加到最前面（重複者移除），最多保留 [`MAX_RECENT`] 筆
    pub fn add_recent(&mut self, ps_path: &Path, pdf_path: &Path) {
        self.remove_recent(ps_path);
        self.recent.insert(
            0,
            RecentItem {
                ps_path: ps_path.to_path_buf(),
                pdf_path: pdf_path.to_path_buf(),
            },
        );
        self.recent.truncate(MAX_RECENT);
    }

    pub fn remove_recent(&mut self, ps_path: &Path) {
        self.recent.retain(|item| item.ps_path != ps_path);
    }

    /// 移除已不存在的檔案，回傳被移除的數量
    pub fn retain_existing_recent(&mut self) -> usize {
        let before = self.recent.len();
        self.recent.retain(|item| {
            let exists = item.ps_path.exists();
            if !exists {
                log::warn!(
                    "Recent file {} no longer exists, dropping it",
                    item.ps_path.display()
                );
            }
            exists
        });
        before - self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.version, "1.0.3");
        assert_eq!(prefs.highlight_limit, DEFAULT_FULL_RECOLOR_LIMIT);
    }

    #[test]
    fn test_unparsable_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Preferences::load(&path).unwrap(), Preferences::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut prefs = Preferences::default();
        prefs.set_converter(PathBuf::from("/usr/bin/pstopdf"), "-o".to_string());
        prefs.converter_timeout_secs = Some(30);
        prefs.add_recent(Path::new("/a.ps"), Path::new("/a.pdf"));
        prefs.save(&path).unwrap();

        let loaded = Preferences::load(&path).unwrap();
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r##"{"colors": {"MathColor": "#010203"}}"##).unwrap();

        let prefs = Preferences::load(&path).unwrap();
        assert_eq!(prefs.highlight_limit, DEFAULT_FULL_RECOLOR_LIMIT);
        let colors = prefs.syntax_colors();
        assert_eq!(colors.color(ColorClass::Math), Rgb::new(1, 2, 3));
        assert_eq!(
            colors.color(ColorClass::Comment),
            ColorClass::Comment.default_color()
        );
    }

    #[test]
    fn test_store_colors_round_trip() {
        let mut colors = SyntaxColors::new();
        colors.apply(ColorClass::FlowControl, Rgb::new(9, 8, 7));

        let mut prefs = Preferences::default();
        prefs.store_colors(&colors);
        assert_eq!(prefs.colors.len(), 7);
        assert_eq!(prefs.colors["FlowControlColor"], Rgb::new(9, 8, 7));
        assert_eq!(prefs.syntax_colors().color(ColorClass::FlowControl), Rgb::new(9, 8, 7));
    }

    #[test]
    fn test_recent_list_order_and_limit() {
        let mut prefs = Preferences::default();
        for idx in 0..12 {
            let ps = PathBuf::from(format!("/f{}.ps", idx));
            prefs.add_recent(&ps, &ps.with_extension("pdf"));
        }
        assert_eq!(prefs.recent.len(), MAX_RECENT);
        assert_eq!(prefs.recent[0].ps_path, PathBuf::from("/f11.ps"));

        // 重新開啟的檔案移到最前面，不重複
        prefs.add_recent(Path::new("/f5.ps"), Path::new("/f5.pdf"));
        assert_eq!(prefs.recent.len(), MAX_RECENT);
        assert_eq!(prefs.recent[0].ps_path, PathBuf::from("/f5.ps"));
        assert_eq!(
            prefs
                .recent
                .iter()
                .filter(|item| item.ps_path == Path::new("/f5.ps"))
                .count(),
            1
        );
    }

    #[test]
    fn test_retain_existing_recent() {
        let dir = TempDir::new().unwrap();
        let kept = dir.path().join("kept.ps");
        fs::write(&kept, "showpage").unwrap();

        let mut prefs = Preferences::default();
        prefs.add_recent(&dir.path().join("gone.ps"), &dir.path().join("gone.pdf"));
        prefs.add_recent(&kept, &kept.with_extension("pdf"));

        assert_eq!(prefs.retain_existing_recent(), 1);
        assert_eq!(prefs.recent.len(), 1);
        assert_eq!(prefs.recent[0].ps_path, kept);
    }

    #[test]
    fn test_configured_converter_carries_timeout() {
        let mut prefs = Preferences::default();
        prefs.set_converter(PathBuf::from("/opt/gs/ps2pdf"), String::new());
        prefs.converter_timeout_secs = Some(5);

        let converter = prefs.converter().unwrap();
        assert_eq!(converter.program(), Path::new("/opt/gs/ps2pdf"));
        assert_eq!(converter.timeout(), Some(Duration::from_secs(5)));
    }
}
