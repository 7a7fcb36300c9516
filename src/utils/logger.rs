// 日誌工具

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// 初始化日誌：`--debug` 時為 Debug，否則只記錄錯誤；`RUST_LOG` 仍然有效
///
/// 終端編輯器執行時輸出會弄亂畫面，可用 `log_file` 改寫到檔案。
pub fn init_logger(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Error
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
