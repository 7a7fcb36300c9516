// 撤銷/重做歷史管理

use super::Edit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert { pos: usize, text: String },
    Delete { pos: usize, text: String },
}

impl Action {
    /// 執行這個動作時對文件造成的編輯（字元數）
    pub fn edit(&self) -> Edit {
        match self {
            Action::Insert { pos, text } => Edit {
                start: *pos,
                removed: 0,
                inserted: text.chars().count(),
            },
            Action::Delete { pos, text } => Edit {
                start: *pos,
                removed: text.chars().count(),
                inserted: 0,
            },
        }
    }

    /// 反向動作（撤銷用）
    pub fn inverse(&self) -> Action {
        match self {
            Action::Insert { pos, text } => Action::Delete {
                pos: *pos,
                text: text.clone(),
            },
            Action::Delete { pos, text } => Action::Insert {
                pos: *pos,
                text: text.clone(),
            },
        }
    }
}

pub struct History {
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    pub fn push(&mut self, action: Action) {
        if self.undo_stack.len() >= self.max_size {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> Option<Action> {
        let action = self.undo_stack.pop()?;
        self.redo_stack.push(action.clone());
        Some(action)
    }

    pub fn redo(&mut self) -> Option<Action> {
        let action = self.redo_stack.pop()?;
        self.undo_stack.push(action.clone());
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(1000)
    }
}
