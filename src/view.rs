use crate::cursor::Cursor;
use crate::pdf::PdfView;
use crate::session::Playground;
use crate::syntax::{line_range, ColorClass, Rgb, SyntaxColors};
use crate::terminal::Terminal;
use crate::utils::{char_width, visual_width};
use anyhow::Result;
use crossterm::{
    cursor, execute, queue,
    style::{self, Color},
};
use std::io::{self, Write};

const TAB_WIDTH: usize = 4;

pub struct View {
    pub offset_row: usize, // 視窗頂部顯示的行號
    pub show_line_numbers: bool,
    pub screen_rows: usize,
    pub screen_cols: usize,
    pub true_color: bool,
}

impl View {
    pub fn new(terminal: &Terminal, true_color: bool) -> Self {
        let (cols, rows) = terminal.size();
        Self {
            offset_row: 0,
            show_line_numbers: true,
            screen_rows: rows.saturating_sub(1) as usize, // 減去狀態欄
            screen_cols: cols as usize,
            true_color,
        }
    }

    pub fn update_size(&mut self, terminal: &Terminal) {
        let (cols, rows) = terminal.size();
        self.screen_rows = rows.saturating_sub(1) as usize;
        self.screen_cols = cols as usize;
    }

    pub fn render<V: PdfView>(
        &mut self,
        playground: &Playground<V>,
        cursor: &Cursor,
        message: Option<&str>,
    ) -> Result<()> {
        self.scroll_if_needed(cursor);

        let doc = playground.document();
        let attrs = playground.attributes();
        let colors = playground.colors();
        let mut stdout = io::stdout();

        queue!(stdout, cursor::Hide, cursor::MoveTo(0, 0))?;

        let line_num_width = self.line_num_width(doc.line_count());
        let available_width = self.screen_cols.saturating_sub(line_num_width);

        for screen_row in 0..self.screen_rows {
            let file_row = self.offset_row + screen_row;
            queue!(stdout, cursor::MoveTo(0, screen_row as u16))?;

            match doc.line(file_row) {
                Some(line) => {
                    if self.show_line_numbers {
                        let line_num =
                            format!("{:>width$} ", file_row + 1, width = line_num_width - 1);
                        queue!(
                            stdout,
                            style::SetForegroundColor(Color::DarkGrey),
                            style::Print(&line_num),
                            style::ResetColor
                        )?;
                    }

                    let text = line.to_string();
                    let classes = attrs.slice(line_range(doc.rope(), file_row));
                    self.render_line(&mut stdout, &text, classes, colors, available_width)?;
                }
                None => {
                    // 空行顯示波浪號
                    queue!(
                        stdout,
                        style::SetForegroundColor(Color::DarkGrey),
                        style::Print("~"),
                        style::ResetColor
                    )?;
                }
            }

            // 清除行的剩餘部分
            queue!(
                stdout,
                crossterm::terminal::Clear(crossterm::terminal::ClearType::UntilNewLine)
            )?;
        }

        self.render_status_bar(&mut stdout, playground, message, cursor)?;

        // 計算光標的視覺列位置（考慮 Tab 展開）
        let current_line = doc.line(cursor.row).map(|s| s.to_string()).unwrap_or_default();
        let visual_col = Self::calculate_visual_column(&current_line, cursor.col);
        let cursor_x = (line_num_width + visual_col).min(self.screen_cols.saturating_sub(1));
        let cursor_y = cursor.row.saturating_sub(self.offset_row);

        queue!(
            stdout,
            cursor::MoveTo(cursor_x as u16, cursor_y as u16),
            cursor::Show
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// 依照字元分類上色，只在顏色改變時送出色碼
    fn render_line(
        &self,
        stdout: &mut io::Stdout,
        line: &str,
        classes: &[Option<ColorClass>],
        colors: &SyntaxColors,
        max_width: usize,
    ) -> Result<()> {
        let mut width = 0;
        let mut current: Option<Option<ColorClass>> = None;

        for (idx, ch) in line.chars().enumerate() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            let (shown, ch_width) = match ch {
                '\t' => (" ".repeat(TAB_WIDTH), TAB_WIDTH),
                _ => (ch.to_string(), char_width(ch)),
            };
            if width + ch_width > max_width {
                break;
            }

            let class = classes.get(idx).copied().flatten();
            if current != Some(class) {
                match class {
                    Some(class) => queue!(
                        stdout,
                        style::SetForegroundColor(self.terminal_color(colors.color(class)))
                    )?,
                    None => queue!(stdout, style::ResetColor)?,
                }
                current = Some(class);
            }

            queue!(stdout, style::Print(shown))?;
            width += ch_width;
        }

        queue!(stdout, style::ResetColor)?;
        Ok(())
    }

    fn terminal_color(&self, rgb: Rgb) -> Color {
        if self.true_color {
            Color::Rgb {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
            }
        } else {
            Color::AnsiValue(ansi_colours::ansi256_from_rgb((rgb.r, rgb.g, rgb.b)))
        }
    }

    pub fn scroll_if_needed(&mut self, cursor: &Cursor) {
        // 向上滾動
        if cursor.row < self.offset_row {
            self.offset_row = cursor.row;
        }
        // 向下滾動
        if self.screen_rows > 0 && cursor.row >= self.offset_row + self.screen_rows {
            self.offset_row = cursor.row - self.screen_rows + 1;
        }
    }

    fn render_status_bar<V: PdfView>(
        &self,
        stdout: &mut io::Stdout,
        playground: &Playground<V>,
        message: Option<&str>,
        cursor: &Cursor,
    ) -> Result<()> {
        queue!(
            stdout,
            cursor::MoveTo(0, self.screen_rows as u16),
            style::SetBackgroundColor(Color::DarkGrey),
            style::SetForegroundColor(Color::White)
        )?;

        let status = status_line(
            &StatusInfo {
                file_name: playground.document().file_name(),
                dirty: playground.is_dirty(),
                mode: playground.mode().indicator(),
                encoding: playground.document().encoding().name(),
                attention: playground.needs_attention(),
                row: cursor.row,
                col: cursor.col,
            },
            message,
        );

        queue!(
            stdout,
            style::Print(fit_width(&status, self.screen_cols)),
            style::ResetColor
        )?;
        Ok(())
    }

    fn line_num_width(&self, line_count: usize) -> usize {
        if self.show_line_numbers {
            line_count.to_string().len() + 1
        } else {
            0
        }
    }

    /// 計算考慮 Tab 展開和字符寬度的視覺列位置
    fn calculate_visual_column(line: &str, buffer_col: usize) -> usize {
        line.chars()
            .take(buffer_col)
            .map(|ch| if ch == '\t' { TAB_WIDTH } else { char_width(ch) })
            .sum()
    }

    pub fn toggle_line_numbers(&mut self) {
        self.show_line_numbers = !self.show_line_numbers;
    }
}

/// 狀態欄顯示的資訊
struct StatusInfo<'a> {
    file_name: String,
    dirty: bool,
    mode: &'static str,
    encoding: &'a str,
    attention: bool,
    row: usize,
    col: usize,
}

fn status_line(info: &StatusInfo<'_>, message: Option<&str>) -> String {
    let modified = if info.dirty { " [modified]" } else { "" };
    let attention = if info.attention { "  [!] Ctrl+E" } else { "" };
    let mut status = format!(
        " {}{}  {}  {}{}  L{}:C{}",
        info.file_name,
        modified,
        info.mode,
        info.encoding,
        attention,
        info.row + 1,
        info.col + 1
    );
    if let Some(msg) = message {
        status.push_str(" - ");
        status.push_str(msg);
    }
    status
}

/// 截斷或補空白到剛好 `cols` 個顯示寬度
fn fit_width(text: &str, cols: usize) -> String {
    let mut result = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = char_width(ch);
        if width + w > cols {
            break;
        }
        result.push(ch);
        width += w;
    }
    let padding = cols.saturating_sub(visual_width(&result));
    result.push_str(&" ".repeat(padding));
    result
}

/// 清除畫面（離開設定等全螢幕對話框後重畫用）
pub fn clear() -> Result<()> {
    execute!(io::stdout(), cursor::MoveTo(0, 0))?;
    Terminal::clear_screen()
}
