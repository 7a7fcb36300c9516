//! psplay - 終端機上的 PostScript 遊樂場
//!
//! 編輯 `.ps` 檔案（語法上色）並呼叫外部轉換程式產生 PDF。

pub mod buffer;
pub mod config;
pub mod convert;
pub mod pdf;
pub mod session;
pub mod state;
pub mod syntax;
pub mod utils;

// 終端編輯器
pub mod cursor;
pub mod dialog;
pub mod editor;
pub mod input;
pub mod terminal;
pub mod view;

// 重新導出常用類型
pub use buffer::Document;
pub use config::Preferences;
pub use convert::{ConvertError, Converter};
pub use session::{ConvertStatus, Playground};
