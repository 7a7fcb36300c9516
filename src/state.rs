//! 編輯器狀態機
//!
//! `{Clean, Dirty}` × [`Mode`]。每次修改都會重新計時（單一計時器），
//! 計時器到期時若為自動模式，就存檔並轉換。計時器是協作式的：
//! 主迴圈以 [`EditorState::next_deadline`] 作為等待輸入的逾時。

use std::time::{Duration, Instant};

/// 最後一次修改後多久自動存檔
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

/// 開檔後延遲多久才做第一次轉換（讓畫面先畫出來）
pub const INITIAL_CONVERSION_DELAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Manual,
    Automatic,
    /// 自動模式下正在轉換
    AutomaticBusy,
}

impl Mode {
    pub fn is_automatic(self) -> bool {
        matches!(self, Mode::Automatic | Mode::AutomaticBusy)
    }

    /// 狀態列上的短標記
    pub fn indicator(self) -> &'static str {
        match self {
            Mode::Manual => "MAN",
            Mode::Automatic => "AUTO",
            Mode::AutomaticBusy => "AUTO*",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Manual => "Manual",
            Mode::Automatic => "Automatic",
            Mode::AutomaticBusy => "Converting",
        }
    }
}

/// 單次計時器：重新 `arm` 會取代先前的期限
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 距離到期還有多久；未啟動時回傳 `None`
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// 到期則解除並回傳 true（只會觸發一次）
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// 計時器到期後要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    AutosaveAndConvert,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    dirty: bool,
    mode: Mode,
    autosave: Debounce,
}

impl EditorState {
    pub fn new() -> Self {
        Self::with_delay(AUTOSAVE_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            dirty: false,
            mode: Mode::Manual,
            autosave: Debounce::new(delay),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 文字被修改：標記為 Dirty 並重新計時
    pub fn on_mutation(&mut self, now: Instant) {
        self.dirty = true;
        self.autosave.arm(now);
    }

    pub fn on_saved(&mut self) {
        self.dirty = false;
    }

    /// 載入新內容後回到 Clean，取消尚未到期的自動存檔
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.autosave.cancel();
    }

    /// Manual ⇄ Automatic，回傳新模式
    pub fn toggle_mode(&mut self) -> Mode {
        let mode = if self.mode.is_automatic() {
            Mode::Manual
        } else {
            Mode::Automatic
        };
        self.set_mode(mode);
        mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        log::debug!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    pub fn begin_conversion(&mut self) {
        if self.mode == Mode::Automatic {
            self.mode = Mode::AutomaticBusy;
        }
    }

    /// 不論成功與否都回到 Automatic
    pub fn end_conversion(&mut self) {
        if self.mode == Mode::AutomaticBusy {
            self.mode = Mode::Automatic;
        }
    }

    pub fn timer_fired(&mut self, now: Instant) -> Option<TimerAction> {
        if !self.autosave.fire(now) {
            return None;
        }
        match self.mode {
            Mode::Automatic => Some(TimerAction::AutosaveAndConvert),
            // 轉換中：等下一輪
            Mode::AutomaticBusy => {
                self.autosave.arm(now);
                Some(TimerAction::Nothing)
            }
            Mode::Manual => Some(TimerAction::Nothing),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}
