use anyhow::{bail, Context, Result};
use ropey::{Rope, RopeSlice};
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::history::{Action, History};
use super::Edit;

pub const UNTITLED_NAME: &str = "Untitled.ps";

/// 新檔的範例程式
pub const TEMPLATE: &str = "%!PS

/test 7 8 9.0 add add def
/Times-Bold findfont 36 scalefont setfont
72 684 moveto (Hello World!) show
4 setlinewidth
0 -4 rmoveto
72 680 lineto stroke
showpage
";

/// 讀入時偵測到的編碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1：每個位元組直接對應 U+0000..=U+00FF
    Latin1,
}

impl TextEncoding {
    /// 讀檔時依序嘗試的編碼（第一個成功者勝出）
    pub const CANDIDATES: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Latin1];

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    /// 嚴格解碼，不接受替換字元
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            // 不是 windows-1252：0x80..=0x9F 保留為 C1 控制字元
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn decode(bytes: &[u8]) -> Option<(String, TextEncoding)> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    TextEncoding::CANDIDATES
        .into_iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (text, encoding)))
}

/// 文件對應的檔案路徑
///
/// 未命名的文件也有一個預設名稱，但 `known` 為 false，存檔前必須先取得路徑。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub known: bool,
}

impl FileRef {
    pub fn untitled() -> Self {
        Self {
            path: PathBuf::from(UNTITLED_NAME),
            known: false,
        }
    }

    pub fn known(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            known: true,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(UNTITLED_NAME)
            .to_string()
    }

    /// 建議的 PDF 路徑：同名、副檔名改為 `.pdf`
    pub fn pdf_path(&self) -> PathBuf {
        self.path.with_extension("pdf")
    }
}

pub struct Document {
    rope: Rope,
    file: FileRef,
    history: History,
    encoding: TextEncoding, // 讀入時偵測到的編碼
}

impl Document {
    pub fn untitled(template: &str) -> Self {
        Self {
            rope: Rope::from_str(template),
            file: FileRef::untitled(),
            history: History::default(),
            encoding: TextEncoding::Utf8,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let (text, encoding) = Self::read(path)?;
        log::debug!("Opened {} as {}", path.display(), encoding.name());

        Ok(Self {
            rope: Rope::from_str(&text),
            file: FileRef::known(path),
            history: History::default(),
            encoding,
        })
    }

    fn read(path: &Path) -> Result<(String, TextEncoding)> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        decode(&bytes).with_context(|| {
            format!(
                "Failed to decode {}: not UTF-8 or ISO-8859-1 text",
                path.display()
            )
        })
    }

    /// 從磁碟重新讀取（放棄未存檔的修改）
    pub fn reload(&mut self) -> Result<()> {
        if !self.file.known {
            bail!("{} has never been saved", self.file.file_name());
        }
        let (text, encoding) = Self::read(&self.file.path)?;
        self.rope = Rope::from_str(&text);
        self.encoding = encoding;
        self.history.clear();
        Ok(())
    }

    /// 插入文字，回傳編輯紀錄（空字串不算編輯）
    pub fn insert(&mut self, pos: usize, text: &str) -> Option<Edit> {
        if text.is_empty() {
            return None;
        }
        let pos = pos.min(self.rope.len_chars());
        let action = Action::Insert {
            pos,
            text: text.to_string(),
        };
        let edit = self.perform(&action);
        self.history.push(action);
        Some(edit)
    }

    pub fn delete(&mut self, range: Range<usize>) -> Option<Edit> {
        let end = range.end.min(self.rope.len_chars());
        let start = range.start.min(end);
        if start == end {
            return None;
        }
        let action = Action::Delete {
            pos: start,
            text: self.rope.slice(start..end).to_string(),
        };
        let edit = self.perform(&action);
        self.history.push(action);
        Some(edit)
    }

    pub fn undo(&mut self) -> Option<Edit> {
        let action = self.history.undo()?;
        Some(self.perform(&action.inverse()))
    }

    pub fn redo(&mut self) -> Option<Edit> {
        let action = self.history.redo()?;
        Some(self.perform(&action))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn perform(&mut self, action: &Action) -> Edit {
        let edit = action.edit();
        match action {
            Action::Insert { pos, text } => self.rope.insert(*pos, text),
            Action::Delete { pos, .. } => self.rope.remove(*pos..pos + edit.removed),
        }
        edit
    }

    /// 以 UTF-8 寫回目前路徑（先寫暫存檔再改名）
    pub fn save(&mut self) -> Result<()> {
        if !self.file.known {
            bail!("{} has no file path yet", self.file.file_name());
        }
        let path = self.file.path.clone();
        self.write_atomic(&path)?;
        self.encoding = TextEncoding::Utf8;
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// 另存新檔，副檔名一律改為 `.ps`，回傳實際使用的路徑
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        let path = path.with_extension("ps");
        self.write_atomic(&path)?;
        self.file = FileRef::known(&path);
        self.encoding = TextEncoding::Utf8;
        log::info!("Saved as {}", path.display());
        Ok(path)
    }

    fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        // 暫存檔預設 0600，沿用原檔的權限
        if let Ok(metadata) = fs::metadata(path) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .with_context(|| format!("Failed to keep permissions of {}", path.display()))?;
        }
        for chunk in self.rope.chunks() {
            temp.write_all(chunk.as_bytes())
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(())
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn line(&self, idx: usize) -> Option<RopeSlice<'_>> {
        if idx < self.line_count() {
            Some(self.rope.line(idx))
        } else {
            None
        }
    }

    /// 行長度（字元數，不含換行符）
    pub fn line_len(&self, idx: usize) -> usize {
        match self.line(idx) {
            Some(line) => {
                let mut len = line.len_chars();
                while len > 0 && matches!(line.char(len - 1), '\n' | '\r') {
                    len -= 1;
                }
                len
            }
            None => 0,
        }
    }

    pub fn line_to_char(&self, line_idx: usize) -> usize {
        self.rope.line_to_char(line_idx.min(self.line_count()))
    }

    pub fn char_to_line(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.rope.len_chars()))
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    pub fn file_name(&self) -> String {
        self.file.file_name()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::untitled(TEMPLATE)
    }
}
