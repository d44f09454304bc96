use std::path::Path;

use serde::{Deserialize, Serialize};

use super::env::EnvConfig;
use crate::error::{PanelError, Result};
use crate::llm::http::DEFAULT_PROGRAM;
use crate::llm::types::non_blank;
use crate::llm::{ChatBackend, ChatMessage, ChatRequest};
use crate::state::DEFAULT_MAX_HISTORY;
use crate::translate::{TranslateBackend, TranslateRequest};

/// 面板配置
///
/// JSON 格式，所有字段可省略。API key 支持 `${VAR}` 引用环境变量，
/// 留空时分别读取 `GEMINI_API_KEY` / `OPENAI_API_KEY` / `DEEPL_API_KEY`。
///
/// ```json
/// {
///   "chatBackend": "openai",
///   "endpoint": "http://localhost:11434/v1/chat/completions",
///   "model": "llama3.2",
///   "systemPrompt": "You are a helpful assistant.",
///   "translateBackend": "deepl",
///   "deeplApiKey": "${DEEPL_API_KEY}"
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub chat_backend: ChatBackend,
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub translate_backend: TranslateBackend,
    pub deepl_api_key: String,
    pub target_language: String,
    pub max_history: usize,
    pub curl_program: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            chat_backend: ChatBackend::Gemini,
            endpoint: String::new(),
            model: "gemini-2.0-flash".to_string(),
            api_key: String::new(),
            system_prompt: String::new(),
            temperature: 0.7,
            translate_backend: TranslateBackend::Google,
            deepl_api_key: String::new(),
            target_language: "en".to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            curl_program: DEFAULT_PROGRAM.to_string(),
        }
    }
}

impl PanelConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| PanelError::configuration(format!("invalid panel config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn chat_backend(&self) -> ChatBackend {
        self.chat_backend
    }

    pub fn translate_backend(&self) -> TranslateBackend {
        self.translate_backend
    }

    /// 配置的端点，留空时使用后端默认值
    pub fn endpoint(&self) -> &str {
        non_blank(Some(self.endpoint.as_str()))
            .unwrap_or_else(|| self.chat_backend.default_endpoint())
    }

    pub fn program(&self) -> &str {
        non_blank(Some(self.curl_program.as_str())).unwrap_or(DEFAULT_PROGRAM)
    }

    pub fn chat_api_key(&self) -> Result<Option<String>> {
        let default_env = match self.chat_backend {
            ChatBackend::Gemini => "GEMINI_API_KEY",
            ChatBackend::OpenAi => "OPENAI_API_KEY",
        };
        EnvConfig::resolve_api_key(&self.api_key, Some(default_env))
    }

    pub fn chat_request(&self, history: Vec<ChatMessage>) -> Result<ChatRequest> {
        let mut request = ChatRequest::new(self.endpoint(), self.model.as_str())
            .with_system_prompt(self.system_prompt.as_str())
            .with_history(history)
            .with_temperature(self.temperature);
        if let Some(api_key) = self.chat_api_key()? {
            request = request.with_api_key(api_key);
        }
        Ok(request)
    }

    /// 构建翻译请求；`target` 为空时使用配置中的目标语言
    pub fn translate_request(
        &self,
        text: &str,
        target: Option<&str>,
        source: Option<&str>,
    ) -> Result<TranslateRequest> {
        let target = non_blank(target).unwrap_or(self.target_language.as_str());
        let mut request = TranslateRequest::new(text, target);
        if let Some(source) = source {
            request = request.with_source_lang(source);
        }
        if self.translate_backend == TranslateBackend::DeepL {
            let api_key = EnvConfig::resolve_api_key(&self.deepl_api_key, Some("DEEPL_API_KEY"))?;
            if let Some(api_key) = api_key {
                request = request.with_api_key(api_key);
            }
        }
        Ok(request)
    }
}
