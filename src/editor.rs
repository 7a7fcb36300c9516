use crate::convert::ConvertError;
use crate::cursor::Cursor;
use crate::dialog;
use crate::input::{handle_key_event, Command};
use crate::pdf::ExternalViewer;
use crate::session::{ConvertStatus, Playground, SaveOutcome};
use crate::state::Mode;
use crate::syntax::{ColorClass, Rgb};
use crate::terminal::{TermEvent, Terminal};
use crate::view::{self, View};
use anyhow::Result;
use crossterm::event::KeyCode;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct Editor {
    playground: Playground<ExternalViewer>,
    cursor: Cursor,
    view: View,
    terminal: Terminal,
    should_quit: bool,
    message: Option<String>,
    quit_times: u8, // 追蹤連續按 Ctrl+Q 的次數
}

impl Editor {
    pub fn new(playground: Playground<ExternalViewer>, true_color: bool) -> Result<Self> {
        let terminal = Terminal::new()?;
        let view = View::new(&terminal, true_color);

        Ok(Self {
            playground,
            cursor: Cursor::new(),
            view,
            terminal,
            should_quit: false,
            message: None,
            quit_times: 0,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        Terminal::enter_raw_mode()?;
        Terminal::clear_screen()?;

        while !self.should_quit {
            self.view
                .render(&self.playground, &self.cursor, self.message.as_deref())?;

            // 等待輸入，最多等到下一個計時器到期
            let timeout = self
                .playground
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()));

            match Terminal::poll_event(timeout)? {
                Some(TermEvent::Key(key_event)) => {
                    if let Some(command) = handle_key_event(key_event) {
                        self.handle_command(command)?;
                    }
                }
                Some(TermEvent::Paste(text)) => self.handle_command(Command::InsertText(text))?,
                Some(TermEvent::Resize) => self.handle_command(Command::Resize)?,
                None => {}
            }

            // 自動轉換開始前先畫一次，顯示忙碌狀態
            let Self {
                playground,
                view,
                cursor,
                message,
                ..
            } = self;
            let result = playground.tick_with(Instant::now(), |pg| {
                if let Err(e) = view.render(pg, cursor, message.as_deref()) {
                    log::warn!("{:#}", e);
                }
            });
            if let Some(result) = result.transpose() {
                self.report_conversion(result);
            }
        }

        Terminal::exit_raw_mode()?;
        Ok(())
    }

    fn handle_command(&mut self, command: Command) -> Result<()> {
        // 任何非 Quit 的命令都重置 quit_times
        if !matches!(command, Command::Quit) {
            self.quit_times = 0;
        }

        match command {
            // 字符輸入
            Command::Insert(ch) => self.insert_text(&ch.to_string()),
            Command::InsertText(text) => self.insert_text(&text),

            // 刪除操作
            Command::Backspace => {
                let doc = self.playground.document();
                let pos = self.cursor.char_position(doc);
                let start = if self.cursor.col > 0 {
                    Some(pos - 1)
                } else if self.cursor.row > 0 {
                    // 刪除整個換行符（包含 \r\n），合併到上一行
                    let prev = self.cursor.row - 1;
                    Some(doc.line_to_char(prev) + doc.line_len(prev))
                } else {
                    None
                };
                if let Some(start) = start {
                    self.playground.delete(start..pos);
                    self.cursor.set_position(self.playground.document(), start);
                }
            }

            Command::Delete => {
                let doc = self.playground.document();
                let pos = self.cursor.char_position(doc);
                let end = if self.cursor.col < doc.line_len(self.cursor.row) {
                    pos + 1
                } else {
                    doc.line_to_char(self.cursor.row + 1)
                };
                self.playground.delete(pos..end);
                self.cursor.set_position(self.playground.document(), pos);
            }

            // 光標移動
            Command::MoveUp => self.cursor.move_up(self.playground.document()),
            Command::MoveDown => self.cursor.move_down(self.playground.document()),
            Command::MoveLeft => self.cursor.move_left(self.playground.document()),
            Command::MoveRight => self.cursor.move_right(self.playground.document()),
            Command::MoveHome => self.cursor.move_to_line_start(),
            Command::MoveEnd => self.cursor.move_to_line_end(self.playground.document()),
            Command::PageUp => {
                let page = self.view.screen_rows.max(1);
                self.cursor.move_page_up(self.playground.document(), page);
            }
            Command::PageDown => {
                let page = self.view.screen_rows.max(1);
                self.cursor.move_page_down(self.playground.document(), page);
            }
            Command::MoveToFileStart => self.cursor.move_to_start(),
            Command::MoveToFileEnd => self.cursor.move_to_end(self.playground.document()),

            // 撤銷/重做
            Command::Undo => match self.playground.undo() {
                Some(edit) => self
                    .cursor
                    .set_position(self.playground.document(), edit.end()),
                None => self.message = Some("Nothing to undo".to_string()),
            },
            Command::Redo => match self.playground.redo() {
                Some(edit) => self
                    .cursor
                    .set_position(self.playground.document(), edit.end()),
                None => self.message = Some("Nothing to redo".to_string()),
            },

            // 文件操作
            Command::New => {
                if self.confirm_discard()? {
                    self.playground.new_file();
                    self.reset_cursor();
                    self.message = Some("New document".to_string());
                }
            }

            Command::Open => {
                if self.confirm_discard()? {
                    if let Some(path) = self.ask_path("Open file:", "")? {
                        self.open(&path);
                    }
                }
            }

            Command::OpenRecent => {
                if self.confirm_discard()? {
                    self.open_recent()?;
                }
            }

            Command::Save => self.save()?,

            Command::Revert => self.revert()?,

            Command::Quit => {
                if self.playground.is_dirty() && self.quit_times == 0 {
                    // 第一次按 Ctrl+Q，顯示警告
                    self.quit_times = 1;
                    self.message = Some(
                        "Unsaved changes! Press Ctrl+Q again to quit, or Ctrl+S to save"
                            .to_string(),
                    );
                } else {
                    self.should_quit = true;
                }
            }

            // 轉換
            Command::Run => self.save_and_convert()?,

            Command::ToggleMode => match self.playground.toggle_mode() {
                Ok(Some(status)) => self.report_conversion(Ok(status)),
                Ok(None) => self.message = Some(format!("{} mode", Mode::Manual.label())),
                Err(e) => self.report_conversion(Err(e)),
            },

            Command::ShowReport => {
                match self.playground.conversion_report() {
                    Some(report) => {
                        dialog::show_text("Converter output", &report, self.terminal.size())?;
                        view::clear()?;
                    }
                    None => self.message = Some("No conversion yet".to_string()),
                }
            }

            Command::SavePdfAs => {
                let suggestion = self
                    .playground
                    .pdf()
                    .target()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                if let Some(dest) = self.ask_path("Save PDF as:", &suggestion)? {
                    self.message = Some(match self.playground.save_pdf_as(&dest) {
                        Ok(()) => format!("PDF saved to {}", dest.display()),
                        Err(e) => format!("{:#}", e),
                    });
                }
            }

            Command::Settings => self.settings()?,

            // 視圖控制
            Command::ToggleLineNumbers => self.view.toggle_line_numbers(),

            Command::Resize => {
                self.terminal.update_size()?;
                self.view.update_size(&self.terminal);
                view::clear()?;
            }

            Command::ClearMessage => self.message = None,
        }

        Ok(())
    }

    fn insert_text(&mut self, text: &str) {
        let pos = self.cursor.char_position(self.playground.document());
        if let Some(edit) = self.playground.insert(pos, text) {
            self.cursor
                .set_position(self.playground.document(), edit.end());
        }
    }

    fn reset_cursor(&mut self) {
        self.cursor = Cursor::new();
        self.view.offset_row = 0;
    }

    fn open(&mut self, path: &Path) {
        match self.playground.open(path) {
            Ok(()) => {
                self.reset_cursor();
                self.message = Some(format!("Opened {}", path.display()));
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.message = Some(format!("{:#}", e));
            }
        }
    }

    fn open_recent(&mut self) -> Result<()> {
        let items: Vec<String> = self
            .playground
            .recent_items()
            .iter()
            .map(|item| item.ps_path.display().to_string())
            .collect();

        let choice = dialog::choose("Open Recent", &items, self.terminal.size())?;
        view::clear()?;

        if let Some(index) = choice {
            match self.playground.open_recent(index) {
                Ok(()) => {
                    self.reset_cursor();
                    self.message = Some(format!("Opened {}", items[index]));
                }
                Err(e) => self.message = Some(format!("{:#}", e)),
            }
        }
        Ok(())
    }

    /// 文件有未存檔的修改時先詢問
    fn confirm_discard(&self) -> Result<bool> {
        if !self.playground.is_dirty() {
            return Ok(true);
        }
        dialog::confirm("Discard unsaved changes?", self.terminal.size())
    }

    fn ask_path(&self, prompt: &str, initial: &str) -> Result<Option<PathBuf>> {
        Ok(dialog::prompt(prompt, initial, self.terminal.size())?
            .map(|input| input.trim().to_string())
            .filter(|input| !input.is_empty())
            .map(PathBuf::from))
    }

    /// 未命名文件：詢問路徑並另存，回傳是否已存檔
    fn save_as_prompt(&mut self) -> Result<bool> {
        let suggestion = self.playground.document().file().path.display().to_string();
        let Some(path) = self.ask_path("Save as:", &suggestion)? else {
            self.message = Some("Save cancelled".to_string());
            return Ok(false);
        };

        match self.playground.save_as(&path) {
            Ok(saved) => {
                self.message = Some(format!("Saved {}", saved.display()));
                Ok(true)
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.message = Some(format!("Save failed: {:#}", e));
                Ok(false)
            }
        }
    }

    fn save(&mut self) -> Result<()> {
        match self.playground.save() {
            Ok(SaveOutcome::Saved) => self.message = Some("File saved".to_string()),
            Ok(SaveOutcome::NeedsPath) => {
                self.save_as_prompt()?;
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.message = Some(format!("Save failed: {:#}", e));
            }
        }
        Ok(())
    }

    fn save_and_convert(&mut self) -> Result<()> {
        match self.playground.save_and_convert() {
            Ok(ConvertStatus::NeedsPath) => {
                if self.save_as_prompt()? {
                    let result = self.playground.convert().map_err(anyhow::Error::from);
                    self.report_conversion(result);
                }
            }
            result => self.report_conversion(result),
        }
        Ok(())
    }

    fn revert(&mut self) -> Result<()> {
        if !self.playground.document().file().known {
            self.message = Some("Nothing to revert to".to_string());
            return Ok(());
        }
        if self.playground.is_dirty()
            && !dialog::confirm("Revert to the saved file?", self.terminal.size())?
        {
            return Ok(());
        }

        let result = self.playground.revert();
        self.cursor.clamp(self.playground.document());
        self.report_conversion(result);
        Ok(())
    }

    fn report_conversion(&mut self, result: Result<ConvertStatus>) {
        self.message = Some(match result {
            Ok(ConvertStatus::Converted) => "PDF updated".to_string(),
            Ok(ConvertStatus::Failed) => {
                "Converter reported errors, Ctrl+E for details".to_string()
            }
            Ok(ConvertStatus::NeedsPath) => "Save the document first (Ctrl+S)".to_string(),
            Err(e) => {
                log::error!("{:#}", e);
                match e.downcast_ref::<ConvertError>() {
                    Some(err) if err.offers_settings() => {
                        format!("{}, Ctrl+K to choose a converter", err)
                    }
                    _ => format!("{:#}", e),
                }
            }
        });
    }

    /// 設定畫面：顏色即時預覽，Esc 還原，Enter 儲存
    fn settings(&mut self) -> Result<()> {
        self.playground.begin_settings();

        let mut converter_path = self
            .playground
            .converter()
            .map(|c| c.program().to_path_buf());
        let mut argument = self
            .playground
            .converter()
            .map(|c| c.argument().to_string())
            .unwrap_or_default();
        let mut notice = String::new();

        loop {
            let mut lines: Vec<String> = self
                .playground
                .colors()
                .iter()
                .enumerate()
                .map(|(idx, (class, color))| format!("{}  {:<12} {}", idx + 1, class, color))
                .collect();
            lines.push(String::new());
            lines.push(format!(
                "c  Converter    {}",
                converter_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            ));
            lines.push(format!("a  Argument     {}", argument));
            if !notice.is_empty() {
                lines.push(String::new());
                lines.push(notice.clone());
            }

            let key = dialog::panel(
                "Settings",
                &lines,
                "1-7: color  c: converter  a: argument  r: reset colors  Enter: accept  Esc: cancel",
                self.terminal.size(),
            )?;
            notice.clear();

            match key.code {
                KeyCode::Char(c @ '1'..='7') => {
                    let class = ColorClass::ALL[c as usize - '1' as usize];
                    let current = self.playground.colors().color(class).to_string();
                    let prompt = format!("{} color:", class);
                    if let Some(input) = dialog::prompt(&prompt, &current, self.terminal.size())? {
                        match input.parse::<Rgb>() {
                            Ok(color) => self.playground.set_color(class, color),
                            Err(e) => notice = e.to_string(),
                        }
                    }
                }
                KeyCode::Char('c') => {
                    let current = converter_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    if let Some(path) = self.ask_path("Converter path:", &current)? {
                        converter_path = Some(path);
                    }
                }
                KeyCode::Char('a') => {
                    if let Some(input) =
                        dialog::prompt("Converter argument:", &argument, self.terminal.size())?
                    {
                        argument = input.trim().to_string();
                    }
                }
                KeyCode::Char('r') => self.playground.reset_colors(),
                KeyCode::Enter => {
                    self.message = Some(
                        match self
                            .playground
                            .accept_settings(converter_path.clone(), argument.clone())
                        {
                            Ok(()) => "Settings saved".to_string(),
                            Err(e) => format!("{:#}", e),
                        },
                    );
                    break;
                }
                KeyCode::Esc => {
                    self.playground.cancel_settings();
                    break;
                }
                _ => {}
            }
        }

        view::clear()
    }
}
