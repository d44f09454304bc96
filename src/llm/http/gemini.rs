use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::command::CurlCommand;
use super::stream::{classify_line, SseLine};
use crate::error::Result;
use crate::llm::protocol::ChatProtocol;
use crate::llm::types::{ChatRequest, MessageRole, RequestSpec, StreamEvent};

pub const SYSTEM_INSTRUCTION_PREFIX: &str = "System instruction: ";
pub const SYSTEM_ACKNOWLEDGMENT: &str = "Understood. I will follow these instructions.";

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

impl<'a> GeminiContent<'a> {
    fn new(role: &'static str, text: &'a str) -> Self {
        Self {
            role,
            parts: vec![GeminiPart { text }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPayload<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

/// Gemini `streamGenerateContent` 协议
///
/// 该 API 没有 system 角色，system prompt 以一问一答的形式放在最前面。
#[derive(Clone, Copy, Debug, Default)]
pub struct GeminiProtocol;

impl GeminiProtocol {
    fn role_for(role: MessageRole) -> &'static str {
        match role {
            MessageRole::Assistant => "model",
            _ => "user",
        }
    }

    fn resolve_url(template: &str, model: &str, api_key: &str) -> String {
        template.replace("{model}", model).replace("{apiKey}", api_key)
    }

    fn extract_text(json: &Value) -> Option<&str> {
        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .filter(|text| !text.is_empty())
    }
}

impl ChatProtocol for GeminiProtocol {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_request(&self, request: &ChatRequest, program: &str) -> Result<RequestSpec> {
        let instruction = request
            .effective_system_prompt()
            .map(|prompt| format!("{SYSTEM_INSTRUCTION_PREFIX}{prompt}"));

        let mut contents = Vec::with_capacity(request.history.len() + 2);
        if let Some(instruction) = instruction.as_deref() {
            contents.push(GeminiContent::new("user", instruction));
            contents.push(GeminiContent::new("model", SYSTEM_ACKNOWLEDGMENT));
        }

        for message in &request.history {
            contents.push(GeminiContent::new(
                Self::role_for(message.role),
                &message.content,
            ));
        }

        let payload = serde_json::to_string(&GeminiPayload {
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        })?;

        let url = Self::resolve_url(
            &request.endpoint,
            &request.model,
            request.api_key.as_deref().unwrap_or_default(),
        );

        debug!(
            model = %request.model,
            turns = request.history.len(),
            "built gemini request"
        );

        let args = CurlCommand::with_program(program)
            .silent()
            .no_buffer()
            .method("POST")
            .header("Content-Type", "application/json")
            .data(payload.clone())
            .url(url.clone())
            .into_args();

        Ok(RequestSpec { url, payload, args })
    }

    fn parse_line(&self, line: &str) -> Option<StreamEvent> {
        match classify_line(line) {
            SseLine::Empty => None,
            SseLine::Done => Some(StreamEvent::Done),
            SseLine::Data(data) => match serde_json::from_str::<Value>(data) {
                Ok(json) => {
                    Self::extract_text(&json).map(|text| StreamEvent::Content(text.to_string()))
                }
                Err(e) => {
                    warn!(error = %e, "unparseable gemini SSE chunk");
                    Some(StreamEvent::Error(format!("Error parsing SSE: {e}")))
                }
            },
            SseLine::Other(line) => {
                // 非 SSE 行可能是一次性返回的完整错误 JSON
                if line.starts_with('{') && line.ends_with('}') {
                    if let Ok(json) = serde_json::from_str::<Value>(line) {
                        if let Some(message) = upstream_error(&json) {
                            return Some(StreamEvent::Error(message));
                        }
                    }
                }
                Some(StreamEvent::Raw(line.to_string()))
            }
        }
    }
}

fn upstream_error(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    if is_falsy(error) {
        return None;
    }
    let message = error["message"]
        .as_str()
        .filter(|m| !m.is_empty())
        .unwrap_or("API error");
    Some(message.to_string())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
