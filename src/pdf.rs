//! PDF 輸出與檢視
//!
//! 轉換結果一律先寫到暫存 PDF，成功後才交給檢視器；
//! 使用者可再另存到 `.ps` 旁邊或任意位置。

use anyhow::{bail, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const TEMP_PDF_NAME: &str = "temp.pdf";
/// 轉換程式寫入的暫存檔，成功後才取代 `temp.pdf`
pub const STAGING_PDF_NAME: &str = "temp.partial.pdf";

/// 顯示 PDF 的介面
pub trait PdfView {
    /// 顯示（或重新載入）指定的 PDF
    fn show(&mut self, path: &Path) -> Result<()>;
    /// 清空顯示（新檔或開啟其他檔案時）
    fn clear(&mut self);
}

/// 什麼都不顯示（`--convert` 等非互動模式）
#[derive(Debug, Default)]
pub struct NoViewer;

impl PdfView for NoViewer {
    fn show(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) {}
}

/// 以外部程式開啟 PDF
///
/// 每份文件只啟動一次檢視器，之後依賴檢視器自己偵測檔案變更重新載入。
#[derive(Debug, Default)]
pub struct ExternalViewer {
    command: Option<String>,
    shown: Option<PathBuf>,
}

impl ExternalViewer {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            shown: None,
        }
    }
}

impl PdfView for ExternalViewer {
    fn show(&mut self, path: &Path) -> Result<()> {
        let Some(command) = self.command.as_deref() else {
            log::debug!("No PDF viewer configured, {} not shown", path.display());
            return Ok(());
        };
        if self.shown.as_deref() == Some(path) {
            return Ok(());
        }

        Command::new(command)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch PDF viewer '{}'", command))?;
        log::info!("Opened {} with {}", path.display(), command);

        self.shown = Some(path.to_path_buf());
        Ok(())
    }

    fn clear(&mut self) {
        self.shown = None;
    }
}

/// 暫存 PDF 與建議的儲存位置
#[derive(Debug, Clone)]
pub struct PdfOutput {
    temp_path: PathBuf,
    staging_path: PathBuf,
    target: Option<PathBuf>,
    produced: bool,
}

impl PdfOutput {
    /// `<temp dir>/psplay/temp.pdf`
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("psplay"))
    }

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            temp_path: dir.as_ref().join(TEMP_PDF_NAME),
            staging_path: dir.as_ref().join(STAGING_PDF_NAME),
            target: None,
            produced: false,
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// 轉換程式的輸出位置
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// 建議的 PDF 路徑（跟著 `.ps` 路徑走）
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, ps_path: &Path) {
        self.target = Some(ps_path.with_extension("pdf"));
    }

    pub fn is_produced(&self) -> bool {
        self.produced
    }

    /// 轉換前建立暫存目錄
    pub fn prepare(&self) -> io::Result<()> {
        match self.temp_path.parent() {
            Some(dir) => fs::create_dir_all(dir),
            None => Ok(()),
        }
    }

    /// 轉換成功：把暫存輸出換成目前的 PDF
    pub fn promote(&mut self) -> io::Result<()> {
        fs::rename(&self.staging_path, &self.temp_path)?;
        self.produced = true;
        Ok(())
    }

    /// 轉換失敗：丟掉暫存輸出，保留上一次成功的 PDF
    pub fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.staging_path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", self.staging_path.display(), e);
            }
        }
    }

    /// 新文件：舊的 PDF 不再屬於目前文件
    pub fn clear(&mut self) {
        self.produced = false;
        self.target = None;
    }

    /// 把暫存 PDF 複製到 `dest`
    pub fn save_as(&mut self, dest: &Path) -> Result<()> {
        if !self.produced || !self.temp_path.exists() {
            bail!("No PDF has been produced yet");
        }
        fs::copy(&self.temp_path, dest)
            .with_context(|| format!("Failed to save PDF to {}", dest.display()))?;
        log::info!("Saved PDF to {}", dest.display());
        self.target = Some(dest.to_path_buf());
        Ok(())
    }
}
