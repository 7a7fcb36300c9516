// 對話框模組 - 用於輸入框、確認框、清單與文字面板

use crate::utils::{char_width, visual_width};
use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{self, Color},
    terminal::{self, ClearType},
};
use std::io::{self, Write};

/// 讀取一個 Press/Repeat 按鍵（忽略 Release 與其他事件）
fn read_key() -> Result<KeyEvent> {
    loop {
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind == KeyEventKind::Press || key_event.kind == KeyEventKind::Repeat {
                return Ok(key_event);
            }
        }
    }
}

/// 截斷到 `cols` 個顯示寬度
fn truncate(text: &str, cols: usize) -> String {
    let mut width = 0;
    text.chars()
        .take_while(|&ch| {
            width += char_width(ch);
            width <= cols
        })
        .collect()
}

/// 在對話框行畫一行（填滿整行）
fn draw_bar(text: &str, row: u16, cols: u16, bg: Color, fg: Color) -> Result<()> {
    let mut stdout = io::stdout();
    let display = truncate(text, cols as usize);
    let remaining = (cols as usize).saturating_sub(visual_width(&display));

    queue!(
        stdout,
        cursor::MoveTo(0, row),
        terminal::Clear(ClearType::CurrentLine),
        style::SetBackgroundColor(bg),
        style::SetForegroundColor(fg),
        style::Print(display),
        style::Print(" ".repeat(remaining)),
        style::ResetColor
    )?;
    Ok(())
}

/// 顯示輸入對話框並獲取用戶輸入；Esc 取消
pub fn prompt(prompt_text: &str, initial: &str, terminal_size: (u16, u16)) -> Result<Option<String>> {
    let mut input = initial.to_string();
    let (cols, rows) = terminal_size;
    let dialog_row = rows.saturating_sub(2);

    loop {
        let display = format!(" {} {}", prompt_text, input);
        draw_bar(&display, dialog_row, cols, Color::DarkBlue, Color::White)?;

        let cursor_x = visual_width(&display).min((cols as usize).saturating_sub(1)) as u16;
        execute!(io::stdout(), cursor::MoveTo(cursor_x, dialog_row), cursor::Show)?;
        io::stdout().flush()?;

        let key_event = read_key()?;
        match key_event.code {
            KeyCode::Enter => return Ok(Some(input)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            _ => {}
        }
    }
}

/// 顯示確認對話框
pub fn confirm(message: &str, terminal_size: (u16, u16)) -> Result<bool> {
    let (cols, rows) = terminal_size;
    let dialog_row = rows.saturating_sub(2);

    loop {
        draw_bar(
            &format!(" {} (y/n)", message),
            dialog_row,
            cols,
            Color::DarkYellow,
            Color::Black,
        )?;
        io::stdout().flush()?;

        match read_key()?.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return Ok(false),
            _ => {}
        }
    }
}

/// 全螢幕面板：標題、內容、底部說明，回傳使用者按下的鍵
pub fn panel(
    title: &str,
    lines: &[String],
    footer: &str,
    terminal_size: (u16, u16),
) -> Result<KeyEvent> {
    let (cols, rows) = terminal_size;
    let mut stdout = io::stdout();

    execute!(stdout, cursor::Hide, terminal::Clear(ClearType::All))?;
    draw_bar(&format!(" {}", title), 0, cols, Color::DarkBlue, Color::White)?;

    let body_rows = rows.saturating_sub(2) as usize;
    for (idx, line) in lines.iter().take(body_rows).enumerate() {
        queue!(
            stdout,
            cursor::MoveTo(1, idx as u16 + 1),
            style::Print(truncate(line, (cols as usize).saturating_sub(1)))
        )?;
    }
    if lines.len() > body_rows {
        queue!(
            stdout,
            cursor::MoveTo(1, rows.saturating_sub(2)),
            style::SetForegroundColor(Color::DarkGrey),
            style::Print(format!("… {} more lines", lines.len() - body_rows + 1)),
            style::ResetColor
        )?;
    }

    draw_bar(
        &format!(" {}", footer),
        rows.saturating_sub(1),
        cols,
        Color::DarkGrey,
        Color::White,
    )?;
    stdout.flush()?;

    read_key()
}

/// 顯示多行文字，按任意鍵關閉
pub fn show_text(title: &str, text: &str, terminal_size: (u16, u16)) -> Result<()> {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    panel(title, &lines, "Press any key to close", terminal_size)?;
    Ok(())
}

/// 從清單中選擇一項（數字鍵或上下鍵 + Enter），Esc 取消
pub fn choose(title: &str, items: &[String], terminal_size: (u16, u16)) -> Result<Option<usize>> {
    if items.is_empty() {
        show_text(title, "(empty)", terminal_size)?;
        return Ok(None);
    }

    let mut selected = 0;
    loop {
        let lines: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let marker = if idx == selected { ">" } else { " " };
                format!("{} {:>2}. {}", marker, idx + 1, item)
            })
            .collect();

        let key = panel(title, &lines, "Enter: open  Esc: cancel", terminal_size)?;
        match key.code {
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => selected = (selected + 1).min(items.len() - 1),
            KeyCode::Enter => return Ok(Some(selected)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char(c) => {
                if let Some(idx) = c.to_digit(10).map(|d| d as usize) {
                    // 1-9 直接選擇，0 代表第 10 項
                    let idx = if idx == 0 { 9 } else { idx - 1 };
                    if idx < items.len() {
                        return Ok(Some(idx));
                    }
                }
            }
            _ => {}
        }
    }
}
