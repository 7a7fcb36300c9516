use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{self, ClearType},
};
use std::io;
use std::time::Duration;

/// 主迴圈關心的終端事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    Key(KeyEvent),
    Resize,
    Paste(String),
}

pub struct Terminal {
    size: (u16, u16),
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let size = terminal::size()?;
        Ok(Self { size })
    }

    pub fn enter_raw_mode() -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            event::EnableBracketedPaste
        )?;
        Ok(())
    }

    pub fn exit_raw_mode() -> Result<()> {
        execute!(
            io::stdout(),
            event::DisableBracketedPaste,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn clear_screen() -> Result<()> {
        execute!(io::stdout(), terminal::Clear(ClearType::All))?;
        Ok(())
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn update_size(&mut self) -> Result<()> {
        self.size = terminal::size()?;
        Ok(())
    }

    /// 等待輸入；`timeout` 為 `None` 時一直等，逾時回傳 `None`
    ///
    /// 計時器到期時間由呼叫者傳入，讓自動存檔在同一條執行緒上觸發。
    pub fn poll_event(timeout: Option<Duration>) -> Result<Option<TermEvent>> {
        loop {
            if let Some(timeout) = timeout {
                if !event::poll(timeout)? {
                    return Ok(None);
                }
            }

            match event::read()? {
                // 只處理 Press 和 Repeat，忽略 Release
                Event::Key(key_event)
                    if key_event.kind == KeyEventKind::Press
                        || key_event.kind == KeyEventKind::Repeat =>
                {
                    return Ok(Some(TermEvent::Key(key_event)));
                }
                Event::Resize(_cols, _rows) => return Ok(Some(TermEvent::Resize)),
                Event::Paste(text) => return Ok(Some(TermEvent::Paste(text))),
                // 其他事件（滑鼠、焦點）不影響計時，直接回到主迴圈重新計算等待時間
                _ if timeout.is_some() => return Ok(None),
                _ => {}
            }
        }
    }

    pub fn show_cursor() -> Result<()> {
        execute!(io::stdout(), cursor::Show)?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = Self::exit_raw_mode();
        let _ = Self::show_cursor();
    }
}
