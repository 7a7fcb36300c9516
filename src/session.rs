//! 遊樂場控制器
//!
//! 與介面無關：組合文件、顏色屬性、狀態機、轉換程式、PDF 輸出與偏好設定。
//! 終端編輯器與 CLI 都只透過這裡操作。

use anyhow::{bail, Context, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::buffer::{Document, Edit, TEMPLATE};
use crate::config::{Preferences, RecentItem};
use crate::convert::{Conversion, ConvertError, Converter};
use crate::pdf::{PdfOutput, PdfView};
use crate::state::{Debounce, EditorState, Mode, TimerAction, INITIAL_CONVERSION_DELAY};
use crate::syntax::{
    recolor_all, recolor_edit, ColorAttributes, ColorClass, RecolorOutcome, Rgb, SyntaxColors,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// 未命名文件，呼叫者需要詢問路徑再 `save_as`
    NeedsPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStatus {
    /// 成功，檢視器已更新
    Converted,
    /// 轉換程式回報錯誤（stderr 有內容）
    Failed,
    NeedsPath,
}

pub struct Playground<V: PdfView> {
    document: Document,
    attrs: ColorAttributes,
    colors: SyntaxColors,
    state: EditorState,
    converter: Option<Converter>,
    pdf: PdfOutput,
    viewer: V,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
    last_conversion: Option<Conversion>,
    attention: bool,
    initial_conversion: Debounce,
}

impl<V: PdfView> Playground<V> {
    /// `prefs_path` 為 `None` 時不會寫回偏好設定
    pub fn new(prefs: Preferences, prefs_path: Option<PathBuf>, pdf: PdfOutput, viewer: V) -> Self {
        let mut playground = Self {
            document: Document::untitled(TEMPLATE),
            attrs: ColorAttributes::new(),
            colors: prefs.syntax_colors(),
            state: EditorState::new(),
            converter: prefs.converter(),
            pdf,
            viewer,
            prefs,
            prefs_path,
            last_conversion: None,
            attention: false,
            initial_conversion: Debounce::new(INITIAL_CONVERSION_DELAY),
        };
        playground.recolor_all();
        playground
    }

    // ===== 存取 =====

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn attributes(&self) -> &ColorAttributes {
        &self.attrs
    }

    pub fn colors(&self) -> &SyntaxColors {
        &self.colors
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    /// 上次轉換有錯誤，需要提醒使用者
    pub fn needs_attention(&self) -> bool {
        self.attention
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn pdf(&self) -> &PdfOutput {
        &self.pdf
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn last_conversion(&self) -> Option<&Conversion> {
        self.last_conversion.as_ref()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.state.set_mode(mode);
    }

    /// 只在這個工作階段使用的轉換程式（偏好設定不變）
    pub fn set_converter(&mut self, converter: Converter) {
        log::debug!("Using converter {}", converter.program().display());
        self.converter = Some(converter);
    }

    // ===== 文件 =====

    pub fn new_file(&mut self) {
        self.replace_document(Document::untitled(TEMPLATE));
        log::debug!("New document");
    }

    /// 開啟檔案；解碼失敗時目前的文件不受影響
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let document = Document::open(path)?;
        self.replace_document(document);

        self.pdf.set_target(path);
        self.remember_recent(path);

        // 先讓畫面畫出來再轉換
        self.initial_conversion.arm(Instant::now());
        log::info!("Opened {}", path.display());
        Ok(())
    }

    /// 放棄修改、重新讀檔並轉換
    pub fn revert(&mut self) -> Result<ConvertStatus> {
        self.document.reload()?;
        self.recolor_all();
        self.state.mark_clean();
        Ok(self.convert()?)
    }

    fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.recolor_all();
        self.state.mark_clean();
        self.initial_conversion.cancel();
        self.pdf.clear();
        self.viewer.clear();
        self.attention = false;
        self.last_conversion = None;
    }

    fn recolor_all(&mut self) -> RecolorOutcome {
        recolor_all(
            self.document.rope(),
            &mut self.attrs,
            self.prefs.highlight_limit,
        )
    }

    // ===== 編輯 =====

    pub fn insert(&mut self, pos: usize, text: &str) -> Option<Edit> {
        let edit = self.document.insert(pos, text)?;
        Some(self.after_edit(edit))
    }

    pub fn delete(&mut self, range: Range<usize>) -> Option<Edit> {
        let edit = self.document.delete(range)?;
        Some(self.after_edit(edit))
    }

    pub fn undo(&mut self) -> Option<Edit> {
        let edit = self.document.undo()?;
        Some(self.after_edit(edit))
    }

    pub fn redo(&mut self) -> Option<Edit> {
        let edit = self.document.redo()?;
        Some(self.after_edit(edit))
    }

    /// 只重新上色被編輯的行，並重新計時自動存檔
    fn after_edit(&mut self, edit: Edit) -> Edit {
        recolor_edit(self.document.rope(), &mut self.attrs, &edit);
        self.state.on_mutation(Instant::now());
        edit
    }

    // ===== 存檔與轉換 =====

    /// 存檔失敗時保持 Dirty
    pub fn save(&mut self) -> Result<SaveOutcome> {
        if !self.document.file().known {
            return Ok(SaveOutcome::NeedsPath);
        }
        self.document.save()?;
        self.state.on_saved();
        Ok(SaveOutcome::Saved)
    }

    /// 另存新檔（副檔名改為 `.ps`），回傳實際路徑
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        let path = self.document.save_as(path)?;
        self.state.on_saved();
        self.pdf.set_target(&path);
        self.remember_recent(&path);
        Ok(path)
    }

    pub fn save_and_convert(&mut self) -> Result<ConvertStatus> {
        match self.save()? {
            SaveOutcome::NeedsPath => Ok(ConvertStatus::NeedsPath),
            SaveOutcome::Saved => Ok(self.convert()?),
        }
    }

    /// 轉換磁碟上的檔案到暫存 PDF
    ///
    /// 成功時更新檢視器並取消提醒；轉換程式回報錯誤時顯示提醒，檢視器與 PDF 不變。
    pub fn convert(&mut self) -> Result<ConvertStatus, ConvertError> {
        self.convert_with(&mut |_| {})
    }

    /// `busy` 在轉換程式啟動前呼叫一次（此時模式為 `AutomaticBusy`），讓介面先畫出忙碌狀態
    fn convert_with(&mut self, busy: &mut dyn FnMut(&Self)) -> Result<ConvertStatus, ConvertError> {
        let converter = self.converter.clone().ok_or(ConvertError::NotConfigured)?;
        if !self.document.file().known {
            return Ok(ConvertStatus::NeedsPath);
        }
        self.initial_conversion.cancel();

        let input = self.document.file().path.clone();
        let staging = self.pdf.staging_path().to_path_buf();
        self.pdf.prepare().map_err(|source| ConvertError::Output {
            path: staging.clone(),
            source,
        })?;

        self.state.begin_conversion();
        busy(&*self);
        let result = converter.run(&input, &staging);
        self.state.end_conversion();
        let conversion = match result {
            Ok(conversion) => conversion,
            Err(e) => {
                self.pdf.discard();
                return Err(e);
            }
        };

        let status = if conversion.succeeded() {
            let output = self.pdf.temp_path().to_path_buf();
            self.pdf.promote().map_err(|source| ConvertError::Output {
                path: output.clone(),
                source,
            })?;
            self.attention = false;
            if let Err(e) = self.viewer.show(&output) {
                log::warn!("{:#}", e);
            }
            ConvertStatus::Converted
        } else {
            // 上一次成功的 PDF 保持不變
            self.pdf.discard();
            self.attention = true;
            ConvertStatus::Failed
        };

        self.last_conversion = Some(conversion);
        Ok(status)
    }

    /// 上次轉換的輸出（截斷後）
    pub fn conversion_report(&self) -> Option<String> {
        self.last_conversion.as_ref().map(Conversion::report)
    }

    /// Manual ⇄ Automatic；切到 Automatic 時立即存檔並轉換
    pub fn toggle_mode(&mut self) -> Result<Option<ConvertStatus>> {
        match self.state.toggle_mode() {
            Mode::Automatic => Ok(Some(self.save_and_convert()?)),
            _ => Ok(None),
        }
    }

    // ===== 計時器 =====

    /// 觸發到期的計時器
    pub fn tick(&mut self, now: Instant) -> Result<Option<ConvertStatus>> {
        self.tick_with(now, |_| {})
    }

    /// 同 [`tick`](Self::tick)，轉換開始前先呼叫 `busy`
    pub fn tick_with<F>(&mut self, now: Instant, mut busy: F) -> Result<Option<ConvertStatus>>
    where
        F: FnMut(&Self),
    {
        let mut status = None;

        if self.initial_conversion.fire(now) {
            log::debug!("Initial conversion");
            status = Some(self.convert_with(&mut busy)?);
        }

        if let Some(TimerAction::AutosaveAndConvert) = self.state.timer_fired(now) {
            log::debug!("Autosave");
            status = Some(match self.save()? {
                SaveOutcome::NeedsPath => ConvertStatus::NeedsPath,
                SaveOutcome::Saved => self.convert_with(&mut busy)?,
            });
        }

        Ok(status)
    }

    /// 最近一個計時器的到期時間（主迴圈用來決定等待多久）
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.state.next_deadline(), self.initial_conversion.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ===== 設定 =====

    pub fn begin_settings(&mut self) {
        self.colors.snapshot();
    }

    /// 即時預覽，取消時會還原
    pub fn set_color(&mut self, class: ColorClass, color: Rgb) {
        self.colors.apply(class, color);
    }

    pub fn reset_colors(&mut self) {
        self.colors.reset();
    }

    pub fn cancel_settings(&mut self) {
        self.colors.restore();
    }

    /// 儲存顏色與轉換程式設定
    ///
    /// 已知位置的轉換程式若未給參數，自動填入該位置的預設參數。
    pub fn accept_settings(&mut self, converter: Option<PathBuf>, argument: String) -> Result<()> {
        if let Some(path) = converter {
            let argument = match Converter::default_argument_for(&path) {
                Some(default) if argument.is_empty() => default.to_string(),
                _ => argument,
            };
            self.prefs.set_converter(path, argument);
            self.converter = self.prefs.converter();
        }

        self.colors.snapshot();
        self.prefs.store_colors(&self.colors);
        self.recolor_all();
        self.save_prefs()
    }

    // ===== 最近開啟 =====

    /// 最近開啟的檔案；已不存在的項目會被移除
    pub fn recent_items(&mut self) -> Vec<RecentItem> {
        if self.prefs.retain_existing_recent() > 0 {
            self.persist_prefs();
        }
        self.prefs.recent.clone()
    }

    pub fn open_recent(&mut self, index: usize) -> Result<()> {
        let Some(item) = self.prefs.recent.get(index).cloned() else {
            bail!("No recent item {}", index + 1);
        };
        if !item.ps_path.exists() {
            log::warn!("Recent file {} is gone", item.ps_path.display());
            self.prefs.remove_recent(&item.ps_path);
            self.persist_prefs();
            bail!("{} no longer exists", item.ps_path.display());
        }
        self.open(&item.ps_path)
    }

    pub fn save_pdf_as(&mut self, dest: &Path) -> Result<()> {
        self.pdf.save_as(dest)?;
        let file = self.document.file().clone();
        if file.known {
            self.prefs.add_recent(&file.path, dest);
            self.persist_prefs();
        }
        Ok(())
    }

    fn remember_recent(&mut self, ps_path: &Path) {
        let pdf_path = self
            .pdf
            .target()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ps_path.with_extension("pdf"));
        self.prefs.add_recent(ps_path, &pdf_path);
        self.persist_prefs();
    }

    fn save_prefs(&self) -> Result<()> {
        match &self.prefs_path {
            Some(path) => self.prefs.save(path).context("Failed to store settings"),
            None => Ok(()),
        }
    }

    /// 偏好設定寫入失敗不影響編輯
    fn persist_prefs(&self) {
        if let Err(e) = self.save_prefs() {
            log::warn!("{:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingView {
        shown: Vec<PathBuf>,
        clears: usize,
    }

    impl PdfView for RecordingView {
        fn show(&mut self, path: &Path) -> Result<()> {
            self.shown.push(path.to_path_buf());
            Ok(())
        }

        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn playground(dir: &TempDir, prefs: Preferences) -> Playground<RecordingView> {
        Playground::new(
            prefs,
            Some(dir.path().join("prefs.json")),
            PdfOutput::new(dir.path().join("out")),
            RecordingView::default(),
        )
    }

    #[cfg(unix)]
    fn stub_converter(dir: &TempDir, body: &str) -> Preferences {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("stub-ps2pdf");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let mut prefs = Preferences::default();
        prefs.set_converter(path, String::new());
        prefs
    }

    fn write_ps(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_new_playground_is_colored_template() {
        let dir = TempDir::new().unwrap();
        let pg = playground(&dir, Preferences::default());
        assert_eq!(pg.document().text(), TEMPLATE);
        assert!(!pg.is_dirty());
        assert_eq!(pg.attributes().len(), TEMPLATE.chars().count());
        assert_eq!(pg.attributes().class_at(0), Some(ColorClass::Comment));
    }

    #[test]
    fn test_edit_marks_dirty_and_recolors() {
        let dir = TempDir::new().unwrap();
        let mut pg = playground(&dir, Preferences::default());

        let pos = TEMPLATE.find("showpage").unwrap();
        pg.insert(pos, "stroke ").unwrap();
        assert!(pg.is_dirty());
        assert_eq!(pg.attributes().len(), pg.document().len_chars());
        assert_eq!(pg.attributes().class_at(pos), Some(ColorClass::Graphics));
        assert!(pg.next_deadline().is_some());

        pg.undo().unwrap();
        assert_eq!(pg.document().text(), TEMPLATE);
        assert_eq!(pg.attributes().len(), TEMPLATE.chars().count());
    }

    #[test]
    fn test_untitled_save_needs_path() {
        let dir = TempDir::new().unwrap();
        let mut pg = playground(&dir, Preferences::default());
        pg.insert(0, "% x\n");
        assert_eq!(pg.save().unwrap(), SaveOutcome::NeedsPath);
        assert!(pg.is_dirty());

        let saved = pg.save_as(&dir.path().join("art")).unwrap();
        assert_eq!(saved, dir.path().join("art.ps"));
        assert!(!pg.is_dirty());
        assert_eq!(pg.pdf().target(), Some(dir.path().join("art.pdf").as_path()));
        assert_eq!(pg.preferences().recent[0].ps_path, saved);
    }

    #[test]
    fn test_failed_save_stays_dirty() {
        let dir = TempDir::new().unwrap();
        let path = write_ps(&dir, "doc.ps", "showpage\n");
        let mut pg = playground(&dir, Preferences::default());
        pg.open(&path).unwrap();
        pg.insert(0, "1 ");

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        assert!(pg.save().is_err());
        assert!(pg.is_dirty());
    }

    #[test]
    fn test_failed_open_keeps_document() {
        let dir = TempDir::new().unwrap();
        let mut pg = playground(&dir, Preferences::default());
        pg.insert(0, "1 ");
        assert!(pg.open(&dir.path().join("missing.ps")).is_err());
        assert!(pg.is_dirty());
        assert!(pg.document().text().starts_with("1 %!PS"));
    }

    #[test]
    fn test_open_recolors_and_schedules_conversion() {
        let dir = TempDir::new().unwrap();
        let path = write_ps(&dir, "a.ps", "72 684 moveto\n");
        let mut pg = playground(&dir, Preferences::default());
        let before = Instant::now();
        pg.open(&path).unwrap();

        assert_eq!(pg.attributes().class_at(7), Some(ColorClass::Graphics));
        assert!(!pg.is_dirty());
        assert!(pg.next_deadline().unwrap() >= before + INITIAL_CONVERSION_DELAY);
        assert_eq!(pg.viewer().clears, 1);
    }

    #[test]
    fn test_highlight_limit_skips_large_documents() {
        let dir = TempDir::new().unwrap();
        let path = write_ps(&dir, "big.ps", "1 2 add\n");
        let mut prefs = Preferences::default();
        prefs.highlight_limit = 4;
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();
        assert_eq!(pg.attributes().len(), 8);
        assert_eq!(pg.attributes().class_at(0), None);
    }

    #[test]
    fn test_convert_without_converter() {
        let dir = TempDir::new().unwrap();
        let mut prefs = Preferences::default();
        prefs.set_converter(dir.path().join("nope"), String::new());
        let mut pg = playground(&dir, prefs);
        pg.save_as(&dir.path().join("x.ps")).unwrap();

        let err = pg.convert().unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
        assert!(err.offers_settings());
    }

    #[test]
    fn test_settings_cancel_and_accept() {
        let dir = TempDir::new().unwrap();
        let mut pg = playground(&dir, Preferences::default());

        pg.begin_settings();
        pg.set_color(ColorClass::Math, Rgb::new(1, 1, 1));
        pg.cancel_settings();
        assert_eq!(
            pg.colors().color(ColorClass::Math),
            ColorClass::Math.default_color()
        );

        pg.begin_settings();
        pg.set_color(ColorClass::Math, Rgb::new(2, 2, 2));
        pg.accept_settings(Some(PathBuf::from("/usr/bin/pstopdf")), String::new())
            .unwrap();
        assert_eq!(pg.colors().color(ColorClass::Math), Rgb::new(2, 2, 2));
        assert_eq!(pg.converter().unwrap().argument(), "-o");

        let stored = Preferences::load(&dir.path().join("prefs.json")).unwrap();
        assert_eq!(stored.colors["MathColor"], Rgb::new(2, 2, 2));
        assert_eq!(stored.converter_argument, "-o");

        // 確認後再取消不會回到更早的顏色
        pg.begin_settings();
        pg.reset_colors();
        pg.cancel_settings();
        assert_eq!(pg.colors().color(ColorClass::Math), Rgb::new(2, 2, 2));
    }

    #[test]
    fn test_recent_items_drop_missing_files() {
        let dir = TempDir::new().unwrap();
        let kept = write_ps(&dir, "kept.ps", "showpage\n");
        let gone = write_ps(&dir, "gone.ps", "showpage\n");
        let mut pg = playground(&dir, Preferences::default());
        pg.open(&gone).unwrap();
        pg.open(&kept).unwrap();
        fs::remove_file(&gone).unwrap();

        let items = pg.recent_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ps_path, kept);
        assert!(pg.open_recent(5).is_err());
        pg.open_recent(0).unwrap();
        assert_eq!(pg.document().file().path, kept);
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_conversion_refreshes_viewer() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let path = write_ps(&dir, "ok.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();

        assert_eq!(pg.convert().unwrap(), ConvertStatus::Converted);
        assert!(!pg.needs_attention());
        assert_eq!(pg.viewer().shown, vec![pg.pdf().temp_path().to_path_buf()]);
        assert!(pg.pdf().is_produced());

        let dest = dir.path().join("copy.pdf");
        pg.save_pdf_as(&dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "showpage\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_conversion_sets_attention() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "echo 'Error: /undefined in foo' >&2");
        let path = write_ps(&dir, "bad.ps", "foo\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();

        assert_eq!(pg.convert().unwrap(), ConvertStatus::Failed);
        assert!(pg.needs_attention());
        assert!(pg.viewer().shown.is_empty());
        assert_eq!(
            pg.conversion_report().unwrap(),
            "\nError: /undefined in foo\n"
        );
        assert!(pg.save_pdf_as(&dir.path().join("none.pdf")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_conversion_keeps_previous_pdf() {
        let dir = TempDir::new().unwrap();
        // 內容有 BAD 時寫出壞掉的輸出並回報錯誤
        let prefs = stub_converter(
            &dir,
            "if grep -q BAD \"$1\"; then echo broken > \"$2\"; echo 'Error: BAD' >&2; else cp \"$1\" \"$2\"; fi",
        );
        let path = write_ps(&dir, "keep.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();
        assert_eq!(pg.convert().unwrap(), ConvertStatus::Converted);

        pg.insert(0, "BAD\n");
        assert_eq!(pg.save_and_convert().unwrap(), ConvertStatus::Failed);
        assert!(pg.needs_attention());
        assert_eq!(
            fs::read_to_string(pg.pdf().temp_path()).unwrap(),
            "showpage\n"
        );
        assert!(!pg.pdf().staging_path().exists());
        assert_eq!(pg.viewer().shown.len(), 1);

        let dest = dir.path().join("last-good.pdf");
        pg.save_pdf_as(&dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "showpage\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_session_converter_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let stored = prefs.converter_path.clone();
        let path = write_ps(&dir, "once.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);

        pg.set_converter(Converter::new("/opt/other/ps2pdf", "-q"));
        pg.open(&path).unwrap();
        assert_eq!(
            pg.converter().unwrap().program(),
            Path::new("/opt/other/ps2pdf")
        );

        // 開檔時會寫回最近開啟清單，但轉換程式維持原設定
        let saved = Preferences::load(&dir.path().join("prefs.json")).unwrap();
        assert_eq!(saved.recent[0].ps_path, path);
        assert_eq!(saved.converter_path, stored);
        assert_eq!(saved.converter_argument, "");
    }

    #[cfg(unix)]
    #[test]
    fn test_busy_mode_is_visible_during_conversion() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let path = write_ps(&dir, "busy.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();
        pg.set_mode(Mode::Automatic);
        pg.insert(0, "% busy\n");

        let mut seen = Vec::new();
        let later = Instant::now() + Duration::from_secs(5);
        let status = pg.tick_with(later, |pg| seen.push(pg.mode())).unwrap();

        assert_eq!(status, Some(ConvertStatus::Converted));
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|mode| *mode == Mode::AutomaticBusy));
        assert_eq!(pg.mode(), Mode::Automatic);
    }

    #[cfg(unix)]
    #[test]
    fn test_automatic_mode_autosaves_after_debounce() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let path = write_ps(&dir, "auto.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();

        // 切到自動模式會立即存檔並轉換
        assert_eq!(pg.toggle_mode().unwrap(), Some(ConvertStatus::Converted));
        assert_eq!(pg.mode(), Mode::Automatic);

        pg.insert(0, "1 2 add\n");
        assert!(pg.is_dirty());
        let now = Instant::now();
        assert_eq!(pg.tick(now).unwrap(), None);

        let later = now + Duration::from_secs(5);
        assert_eq!(pg.tick(later).unwrap(), Some(ConvertStatus::Converted));
        assert!(!pg.is_dirty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "1 2 add\nshowpage\n");
        assert_eq!(pg.mode(), Mode::Automatic);
        assert_eq!(pg.next_deadline(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_manual_mode_timer_does_not_save() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let path = write_ps(&dir, "manual.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();
        pg.insert(0, "% ");

        let later = Instant::now() + Duration::from_secs(5);
        // 只有開檔後的延遲轉換
        assert_eq!(pg.tick(later).unwrap(), Some(ConvertStatus::Converted));
        assert!(pg.is_dirty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "showpage\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_revert_reloads_and_converts() {
        let dir = TempDir::new().unwrap();
        let prefs = stub_converter(&dir, "cp \"$1\" \"$2\"");
        let path = write_ps(&dir, "rev.ps", "showpage\n");
        let mut pg = playground(&dir, prefs);
        pg.open(&path).unwrap();
        pg.insert(0, "garbage ");

        assert_eq!(pg.revert().unwrap(), ConvertStatus::Converted);
        assert_eq!(pg.document().text(), "showpage\n");
        assert!(!pg.is_dirty());
    }
}
