//! 外部 PostScript → PDF 轉換程式
//!
//! 執行 `program input [argument] output`，完整擷取 stdout 與 stderr。
//! 轉換是否失敗只看 stderr 是否有內容，結束碼只記錄在日誌裡。

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// 常見的轉換程式位置與對應的參數
pub const KNOWN_CONVERTERS: &[(&str, &str)] = &[
    ("/usr/bin/pstopdf", "-o"),
    ("/opt/local/bin/ps2pdf", ""),
    ("/usr/local/bin/ps2pdf", ""),
    ("/usr/local/opt/ps2pdf", ""),
    ("/usr/local/opt/ghostscript/bin/ps2pdf", ""),
    ("/usr/bin/ps2pdf", ""),
];

const REPORT_LIMIT: usize = 250;
const REPORT_STDOUT_PREFIX: usize = 200;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub enum ConvertError {
    /// 尚未設定、也找不到轉換程式
    NotConfigured,
    /// 轉換程式不存在或無法執行
    NotFound(PathBuf),
    Launch { program: PathBuf, source: io::Error },
    TimedOut { program: PathBuf, after: Duration },
    /// 無法準備輸出位置
    Output { path: PathBuf, source: io::Error },
}

impl ConvertError {
    /// 是否應該引導使用者到設定畫面
    pub fn offers_settings(&self) -> bool {
        matches!(
            self,
            ConvertError::NotConfigured | ConvertError::NotFound(_) | ConvertError::Launch { .. }
        )
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::NotConfigured => f.write_str("No PostScript converter configured"),
            ConvertError::NotFound(program) => write!(
                f,
                "Converter '{}' not found or not executable",
                program.display()
            ),
            ConvertError::Launch { program, source } => {
                write!(f, "Failed to launch '{}': {}", program.display(), source)
            }
            ConvertError::TimedOut { program, after } => write!(
                f,
                "Converter '{}' did not finish within {}s",
                program.display(),
                after.as_secs()
            ),
            ConvertError::Output { path, source } => {
                write!(f, "Cannot write PDF to {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Launch { source, .. } | ConvertError::Output { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// 一次轉換的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub stdout: String,
    pub stderr: String,
    /// 結束碼（被訊號終止時為 `None`）
    pub status: Option<i32>,
}

impl Conversion {
    pub fn succeeded(&self) -> bool {
        self.stderr.is_empty()
    }

    /// 給使用者看的錯誤報告（過長的輸出會被截斷）
    pub fn report(&self) -> String {
        format!(
            "{}\n{}",
            abbreviate(&self.stdout, REPORT_LIMIT, REPORT_STDOUT_PREFIX),
            abbreviate(&self.stderr, REPORT_LIMIT, REPORT_LIMIT)
        )
    }
}

/// 截斷過長的文字：保留前 `prefix` 個字元與最後 `limit - prefix` 個字元
pub fn abbreviate(text: &str, limit: usize, prefix: usize) -> String {
    let count = text.chars().count();
    if count <= limit {
        return text.to_string();
    }

    let prefix = prefix.min(limit);
    let head: String = text.chars().take(prefix).collect();
    let tail_len = limit - prefix;
    if tail_len == 0 {
        return format!("{}…", head);
    }
    let tail: String = text.chars().skip(count - tail_len).collect();
    format!("{}\n…\n{}", head, tail)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    program: PathBuf,
    argument: String,
    timeout: Option<Duration>,
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>, argument: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            argument: argument.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 在常見位置尋找轉換程式
    pub fn discover() -> Option<Self> {
        KNOWN_CONVERTERS
            .iter()
            .map(|(program, argument)| (Path::new(program), *argument))
            .find(|(program, _)| is_executable(program))
            .map(|(program, argument)| {
                log::info!("Found converter: {}", program.display());
                Self::new(program, argument)
            })
    }

    /// 已知位置的預設參數（其他位置回傳 `None`）
    pub fn default_argument_for(program: &Path) -> Option<&'static str> {
        KNOWN_CONVERTERS
            .iter()
            .find(|(known, _)| Path::new(known) == program)
            .map(|(_, argument)| *argument)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn available(&self) -> bool {
        is_executable(&self.program)
    }

    /// `[input, argument, output]`，空字串會被略過
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
        [
            input.to_string_lossy().into_owned(),
            self.argument.clone(),
            output.to_string_lossy().into_owned(),
        ]
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .collect()
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<Conversion, ConvertError> {
        if !self.available() {
            return Err(ConvertError::NotFound(self.program.clone()));
        }

        let args = self.arguments(input, output);
        log::debug!("Running {} {:?}", self.program.display(), args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConvertError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let (stdout, stderr, status) = match self.timeout {
            None => {
                let result = child
                    .wait_with_output()
                    .map_err(|source| ConvertError::Launch {
                        program: self.program.clone(),
                        source,
                    })?;
                (result.stdout, result.stderr, result.status)
            }
            Some(timeout) => self.wait_with_timeout(child, timeout)?,
        };

        let conversion = Conversion {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            status: status.code(),
        };

        if conversion.succeeded() {
            log::info!(
                "Converted {} (exit {:?})",
                input.display(),
                conversion.status
            );
        } else {
            log::warn!(
                "Converter reported errors for {} (exit {:?})",
                input.display(),
                conversion.status
            );
        }

        Ok(conversion)
    }

    /// 背景執行緒讀取輸出，避免管線塞滿；逾時則結束子程序
    fn wait_with_timeout(
        &self,
        mut child: Child,
        timeout: Duration,
    ) -> Result<(Vec<u8>, Vec<u8>, ExitStatus), ConvertError> {
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let launch_error = |source| ConvertError::Launch {
            program: self.program.clone(),
            source,
        };

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(launch_error)? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "Killing {} after {:?}",
                    self.program.display(),
                    timeout
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(ConvertError::TimedOut {
                    program: self.program.clone(),
                    after: timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let collect = |reader: Option<thread::JoinHandle<Vec<u8>>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default()
        };
        Ok((collect(stdout), collect(stderr), status))
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
