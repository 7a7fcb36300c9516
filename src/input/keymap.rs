use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::handler::Command;

pub fn handle_key_event(event: KeyEvent) -> Option<Command> {
    match (event.code, event.modifiers) {
        // 基本移動
        (KeyCode::Up, KeyModifiers::NONE) => Some(Command::MoveUp),
        (KeyCode::Down, KeyModifiers::NONE) => Some(Command::MoveDown),
        (KeyCode::Left, KeyModifiers::NONE) => Some(Command::MoveLeft),
        (KeyCode::Right, KeyModifiers::NONE) => Some(Command::MoveRight),
        (KeyCode::Home, KeyModifiers::NONE) => Some(Command::MoveHome),
        (KeyCode::End, KeyModifiers::NONE) => Some(Command::MoveEnd),
        (KeyCode::PageUp, _) => Some(Command::PageUp),
        (KeyCode::PageDown, _) => Some(Command::PageDown),
        (KeyCode::Home, KeyModifiers::CONTROL) => Some(Command::MoveToFileStart),
        (KeyCode::End, KeyModifiers::CONTROL) => Some(Command::MoveToFileEnd),

        // 字符輸入
        (KeyCode::Char(c), KeyModifiers::NONE) | (KeyCode::Char(c), KeyModifiers::SHIFT) => {
            Some(Command::Insert(c))
        }
        (KeyCode::Enter, _) => Some(Command::Insert('\n')),
        (KeyCode::Tab, KeyModifiers::NONE) => Some(Command::Insert('\t')),

        // 刪除操作
        (KeyCode::Backspace, _) => Some(Command::Backspace),
        (KeyCode::Delete, _) => Some(Command::Delete),

        // Ctrl 組合鍵
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => Some(Command::Save),
        (KeyCode::Char('r'), KeyModifiers::CONTROL) => Some(Command::Run),
        (KeyCode::Char('t'), KeyModifiers::CONTROL) => Some(Command::ToggleMode),
        (KeyCode::Char('e'), KeyModifiers::CONTROL) => Some(Command::ShowReport),
        (KeyCode::Char('o'), KeyModifiers::CONTROL) => Some(Command::Open),
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => Some(Command::New),
        (KeyCode::Char('g'), KeyModifiers::CONTROL) => Some(Command::OpenRecent),
        (KeyCode::Char('p'), KeyModifiers::CONTROL) => Some(Command::SavePdfAs),
        (KeyCode::Char('k'), KeyModifiers::CONTROL) => Some(Command::Settings),
        (KeyCode::Char('q'), KeyModifiers::CONTROL) => Some(Command::Quit),
        (KeyCode::Char('z'), KeyModifiers::CONTROL) => Some(Command::Undo),
        (KeyCode::Char('y'), KeyModifiers::CONTROL) => Some(Command::Redo),
        (KeyCode::Char('l'), KeyModifiers::CONTROL) => Some(Command::ToggleLineNumbers),
        (KeyCode::F(5), _) => Some(Command::Revert),

        // ESC 清除訊息
        (KeyCode::Esc, _) => Some(Command::ClearMessage),

        _ => None,
    }
}
