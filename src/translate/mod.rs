//! 翻译后端：单次（非流式）请求的命令构建与响应解析

pub mod deepl;
pub mod google;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::llm::http::DEFAULT_PROGRAM;
use crate::llm::RequestSpec;

pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;

pub const EMPTY_RESPONSE: &str = "Empty response";
pub const PARSE_FAILURE: &str = "Failed to parse response";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            source_lang: None,
            api_key: None,
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// 翻译后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateBackend {
    Google,
    #[serde(rename = "deepl")]
    DeepL,
}

impl TranslateBackend {
    pub fn name(&self) -> &'static str {
        match self {
            TranslateBackend::Google => "google",
            TranslateBackend::DeepL => "deepl",
        }
    }

    pub fn build_command(&self, request: &TranslateRequest) -> Result<RequestSpec> {
        self.build_command_with(request, DEFAULT_PROGRAM)
    }

    pub fn build_command_with(
        &self,
        request: &TranslateRequest,
        program: &str,
    ) -> Result<RequestSpec> {
        match self {
            TranslateBackend::Google => GoogleTranslator::build_command(request, program),
            TranslateBackend::DeepL => DeepLTranslator::build_command(request, program),
        }
    }

    /// 解析完整响应体，返回译文
    pub fn parse_response(&self, body: &str) -> Result<String> {
        if body.trim().is_empty() {
            return Err(PanelError::Parse(EMPTY_RESPONSE.to_string()));
        }
        match self {
            TranslateBackend::Google => GoogleTranslator::parse_response(body),
            TranslateBackend::DeepL => DeepLTranslator::parse_response(body),
        }
    }
}

impl fmt::Display for TranslateBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TranslateBackend {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(TranslateBackend::Google),
            "deepl" => Ok(TranslateBackend::DeepL),
            _ => Err(PanelError::unknown_format()),
        }
    }
}

/// 按后端名称解析翻译响应
///
/// 空响应优先于后端名称检查，未知后端返回 `Unknown backend or format`。
pub fn parse_translate_response(backend: &str, body: &str) -> Result<String> {
    if body.trim().is_empty() {
        return Err(PanelError::Parse(EMPTY_RESPONSE.to_string()));
    }
    backend.parse::<TranslateBackend>()?.parse_response(body)
}

pub(crate) fn parse_body(body: &str) -> Result<serde_json::Value> {
    serde_json::from_str(body).map_err(|_| PanelError::Parse(PARSE_FAILURE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        let err = TranslateBackend::Google.parse_response("  \n").unwrap_err();
        assert_eq!(err.to_string(), "Empty response");
        let err = parse_translate_response("bing", "").unwrap_err();
        assert_eq!(err.to_string(), "Empty response");
    }

    #[test]
    fn test_unknown_backend() {
        let err = parse_translate_response("bing", "{}").unwrap_err();
        assert!(matches!(err, PanelError::UnknownFormat(_)));
        assert_eq!(err.to_string(), "Unknown backend or format");
    }

    #[test]
    fn test_backend_names_round_trip() {
        for backend in [TranslateBackend::Google, TranslateBackend::DeepL] {
            assert_eq!(backend.name().parse::<TranslateBackend>().unwrap(), backend);
        }
        assert_eq!("DeepL".parse::<TranslateBackend>().unwrap(), TranslateBackend::DeepL);
    }
}
