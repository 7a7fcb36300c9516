#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // 字符輸入
    Insert(char),
    InsertText(String),

    // 刪除操作
    Delete,
    Backspace,

    // 光標移動
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveHome,
    MoveEnd,
    PageUp,
    PageDown,
    MoveToFileStart, // Ctrl+Home
    MoveToFileEnd,   // Ctrl+End

    // 文件操作
    New,
    Open,
    OpenRecent,
    Save,
    Revert,
    Quit,

    // 轉換
    Run,
    ToggleMode,
    ShowReport,
    SavePdfAs,

    // 撤銷/重做
    Undo,
    Redo,

    // 設定
    Settings,

    // 視圖控制
    ToggleLineNumbers,
    Resize,

    // 清除訊息
    ClearMessage,
}
