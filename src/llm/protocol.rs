use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::http::{GeminiProtocol, OpenAiProtocol, DEFAULT_PROGRAM};
use super::types::{ChatRequest, RequestSpec, StreamEvent};
use crate::error::{PanelError, Result};

/// 聊天后端协议：构建请求命令 + 逐行解析流式响应
///
/// 实现必须是无状态的，`parse_line` 可以在多个并发流上重复调用。
pub trait ChatProtocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_request(&self, request: &ChatRequest, program: &str) -> Result<RequestSpec>;

    fn parse_line(&self, line: &str) -> Option<StreamEvent>;
}

/// 聊天后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatBackend {
    #[serde(alias = "google")]
    Gemini,
    #[serde(
        rename = "openai",
        alias = "openai-compatible",
        alias = "ollama",
        alias = "lmstudio"
    )]
    OpenAi,
}

static GEMINI: GeminiProtocol = GeminiProtocol;
static OPENAI: OpenAiProtocol = OpenAiProtocol;

impl ChatBackend {
    pub fn protocol(&self) -> &'static dyn ChatProtocol {
        match self {
            ChatBackend::Gemini => &GEMINI,
            ChatBackend::OpenAi => &OPENAI,
        }
    }

    pub fn build_command(&self, request: &ChatRequest) -> Result<RequestSpec> {
        self.build_command_with(request, DEFAULT_PROGRAM)
    }

    pub fn build_command_with(
        &self,
        request: &ChatRequest,
        program: &str,
    ) -> Result<RequestSpec> {
        self.protocol().build_request(request, program)
    }

    pub fn parse_stream_line(&self, line: &str) -> Option<StreamEvent> {
        self.protocol().parse_line(line)
    }

    /// 该后端的默认端点
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ChatBackend::Gemini => GEMINI_DEFAULT_ENDPOINT,
            ChatBackend::OpenAi => OPENAI_DEFAULT_ENDPOINT,
        }
    }
}

const GEMINI_DEFAULT_ENDPOINT: &str = concat!(
    "https://generativelanguage.googleapis.com/v1beta/models/",
    "{model}:streamGenerateContent?alt=sse&key={apiKey}"
);
const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

impl fmt::Display for ChatBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol().name())
    }
}

impl FromStr for ChatBackend {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ChatBackend::Gemini),
            "openai" | "openai-compatible" | "ollama" | "lmstudio" => Ok(ChatBackend::OpenAi),
            _ => Err(PanelError::unknown_format()),
        }
    }
}
