use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use skarn_shared::protocol::TextOrigin;

pub const CHAT_HISTORY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub origin: TextOrigin,
    pub text: String,
}

/// Bounded history of player-visible server text. The UI layer renders it;
/// overflow drops the oldest line.
pub struct ChatLog {
    lines: Mutex<VecDeque<ChatLine>>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(CHAT_HISTORY_LEN)),
        }
    }

    pub fn push(&self, origin: TextOrigin, text: String) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == CHAT_HISTORY_LEN {
            lines.pop_front();
        }
        lines.push_back(ChatLine { origin, text });
    }

    pub fn lines(&self) -> Vec<ChatLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}
