use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PanelError, Result};
use crate::llm::ChatMessage;

pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_TAB: &str = "ai";

/// 面板会话状态：消息记录、当前标签页和输入框内容
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub active_tab: String,
    pub chat_input_text: String,
    pub chat_input_cursor_position: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            active_tab: DEFAULT_TAB.to_string(),
            chat_input_text: String::new(),
            chat_input_cursor_position: 0,
        }
    }
}

impl SessionState {
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn encode(&self, max_history: usize) -> Result<String> {
        SessionStateCodec::encode(
            &self.messages,
            &self.active_tab,
            max_history,
            &self.chat_input_text,
            self.chat_input_cursor_position,
        )
    }
}

/// 磁盘上的格式，字段缺失时使用默认值
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    messages: Option<Vec<ChatMessage>>,
    active_tab: Option<String>,
    chat_input_text: Option<String>,
    chat_input_cursor_position: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredStateRef<'a> {
    messages: &'a [ChatMessage],
    active_tab: &'a str,
    chat_input_text: &'a str,
    chat_input_cursor_position: usize,
    timestamp: i64,
}

pub struct SessionStateCodec;

impl SessionStateCodec {
    /// 空白输入表示没有保存过状态，返回 `Ok(None)`；解析失败返回错误，由调用方决定是否丢弃
    pub fn decode(raw: &str) -> Result<Option<SessionState>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let stored: StoredState = serde_json::from_str(raw).map_err(|e| {
            warn!(error = %e, "persisted session state is corrupt");
            PanelError::Parse(e.to_string())
        })?;

        Ok(Some(SessionState {
            messages: stored.messages.unwrap_or_default(),
            active_tab: stored
                .active_tab
                .filter(|tab| !tab.is_empty())
                .unwrap_or_else(|| DEFAULT_TAB.to_string()),
            chat_input_text: stored.chat_input_text.unwrap_or_default(),
            chat_input_cursor_position: stored.chat_input_cursor_position.unwrap_or_default(),
        }))
    }

    pub fn encode(
        messages: &[ChatMessage],
        active_tab: &str,
        max_history: usize,
        chat_input_text: &str,
        cursor_position: usize,
    ) -> Result<String> {
        Self::encode_at(
            messages,
            active_tab,
            max_history,
            chat_input_text,
            cursor_position,
            Utc::now().timestamp(),
        )
    }

    /// 只保留最近的 `max_history` 条消息（0 视为默认值 100），输出两空格缩进的 JSON
    pub fn encode_at(
        messages: &[ChatMessage],
        active_tab: &str,
        max_history: usize,
        chat_input_text: &str,
        cursor_position: usize,
        timestamp: i64,
    ) -> Result<String> {
        let max_history = if max_history == 0 {
            DEFAULT_MAX_HISTORY
        } else {
            max_history
        };
        let start = messages.len().saturating_sub(max_history);

        let stored = StoredStateRef {
            messages: &messages[start..],
            active_tab,
            chat_input_text,
            chat_input_cursor_position: cursor_position,
            timestamp,
        };
        Ok(serde_json::to_string_pretty(&stored)?)
    }
}
