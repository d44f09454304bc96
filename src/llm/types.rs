use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// 对话中的一条消息，追加到历史后不再修改
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user<T: Into<String>>(content: T) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system<T: Into<String>>(content: T) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// 一次聊天请求的全部输入
///
/// `endpoint` 对 Gemini 是带 `{model}` / `{apiKey}` 占位符的 URL 模板，
/// 对 OpenAI 兼容接口是完整的 chat completions 地址。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    0.7
}

impl ChatRequest {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            system_prompt: None,
            history: Vec::new(),
            temperature: default_temperature(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// 非空白的 system prompt
    pub fn effective_system_prompt(&self) -> Option<&str> {
        non_blank(self.system_prompt.as_deref())
    }

    /// 非空白的 API key
    pub fn effective_api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// 交给外部传输层执行的请求
///
/// `args` 是完整的命令行（含程序名），直接执行，不经过 shell。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: String,
    pub payload: String,
    pub args: Vec<String>,
}

/// 单行流式输出解析后的事件
///
/// 解析函数返回 `Option<StreamEvent>`，`None` 表示这一行没有事件。
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StreamEvent {
    Content(String),
    Done,
    Error(String),
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let message = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn blank_system_prompt_is_ignored() {
        let request = ChatRequest::new("http://localhost", "m").with_system_prompt("   ");
        assert_eq!(request.effective_system_prompt(), None);
        let request = request.with_system_prompt("be brief");
        assert_eq!(request.effective_system_prompt(), Some("be brief"));
    }

    #[test]
    fn stream_event_serializes_tagged() {
        let json = serde_json::to_string(&StreamEvent::Content("x".into())).unwrap();
        assert_eq!(json, r#"{"type":"content","value":"x"}"#);
        let json = serde_json::to_string(&StreamEvent::Done).unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
    }
}
