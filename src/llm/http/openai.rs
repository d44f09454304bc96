use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::command::CurlCommand;
use super::stream::{classify_line, SseLine};
use crate::error::Result;
use crate::llm::protocol::ChatProtocol;
use crate::llm::types::{ChatMessage, ChatRequest, MessageRole, RequestSpec, StreamEvent};

#[derive(Serialize)]
struct OpenAiPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
}

/// OpenAI chat completions 协议（也适用于 Ollama、LM Studio 等兼容端点）
///
/// API key 为空时不发送 `Authorization` 头，以支持本地无鉴权服务。
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiProtocol;

impl OpenAiProtocol {
    /// 先取流式 `delta.content`，再回退到非流式的 `message.content`
    fn extract_text(json: &Value) -> Option<&str> {
        let choice = &json["choices"][0];
        choice["delta"]["content"]
            .as_str()
            .filter(|text| !text.is_empty())
            .or_else(|| {
                choice["message"]["content"]
                    .as_str()
                    .filter(|text| !text.is_empty())
            })
    }
}

impl ChatProtocol for OpenAiProtocol {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn build_request(&self, request: &ChatRequest, program: &str) -> Result<RequestSpec> {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        if let Some(prompt) = request.effective_system_prompt() {
            messages.push(ChatMessage::new(MessageRole::System, prompt));
        }
        messages.extend(request.history.iter().cloned());

        let payload = serde_json::to_string(&OpenAiPayload {
            model: &request.model,
            messages,
            temperature: request.temperature,
            stream: true,
        })?;

        let mut command = CurlCommand::with_program(program)
            .silent()
            .show_errors()
            .no_buffer()
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(api_key) = request.effective_api_key() {
            command = command.header("Authorization", &format!("Bearer {api_key}"));
        }

        debug!(
            model = %request.model,
            turns = request.history.len(),
            authenticated = request.effective_api_key().is_some(),
            "built openai request"
        );

        let args = command
            .data(payload.clone())
            .url(request.endpoint.clone())
            .into_args();

        Ok(RequestSpec {
            url: request.endpoint.clone(),
            payload,
            args,
        })
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
                    warn!(error = %e, "unparseable openai SSE chunk");
                    Some(StreamEvent::Error(format!("Error parsing SSE JSON: {e}")))
                }
            },
            SseLine::Other(line) => Some(StreamEvent::Raw(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest::new("https://api.openai.com/v1/chat/completions", "gpt-4o-mini")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hey")])
    }

    #[test]
    fn test_payload_shape() {
        let req = request().with_system_prompt("be kind").with_temperature(0.25);
        let spec = OpenAiProtocol.build_request(&req, "curl").unwrap();
        let json: Value = serde_json::from_str(&spec.payload).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["stream"], true);
        assert_eq!(json["temperature"], 0.25);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "be kind");
        assert_eq!(messages[2]["role"], "assistant");
        assert!(spec.payload.starts_with(r#"{"model":"gpt-4o-mini","messages":"#));
    }

    #[test]
    fn test_auth_header_only_with_key() {
        let spec = OpenAiProtocol.build_request(&request(), "curl").unwrap();
        assert!(!spec.args.iter().any(|arg| arg.starts_with("Authorization")));

        let spec = OpenAiProtocol
            .build_request(&request().with_api_key("  "), "curl")
            .unwrap();
        assert!(!spec.args.iter().any(|arg| arg.starts_with("Authorization")));

        let spec = OpenAiProtocol
            .build_request(&request().with_api_key("sk-test"), "curl")
            .unwrap();
        let pos = spec
            .args
            .iter()
            .position(|arg| arg == "Authorization: Bearer sk-test")
            .unwrap();
        assert_eq!(spec.args[pos - 1], "-H");
        assert!(!spec.url.contains("sk-test"));
    }

    #[test]
    fn test_args_end_with_body_and_url() {
        let spec = OpenAiProtocol.build_request(&request(), "curl").unwrap();
        let n = spec.args.len();
        assert_eq!(spec.args[n - 3], "-d");
        assert_eq!(spec.args[n - 2], spec.payload);
        assert_eq!(spec.args[n - 1], spec.url);
        assert_eq!(&spec.args[..4], &["curl", "-s", "-S", "--no-buffer"]);
    }

    #[test]
    fn test_parse_delta_and_message() {
        assert_eq!(
            OpenAiProtocol.parse_line(r#"data: {"choices":[{"delta":{"content":"x"}}]}"#),
            Some(StreamEvent::Content("x".into()))
        );
        assert_eq!(
            OpenAiProtocol.parse_line(r#"data: {"choices":[{"message":{"content":"x"}}]}"#),
            Some(StreamEvent::Content("x".into()))
        );
        assert_eq!(
            OpenAiProtocol.parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
    }

    #[test]
    fn test_non_sse_line_is_raw() {
        assert_eq!(
            OpenAiProtocol.parse_line(r#"{"error":{"message":"bad key"}}"#),
            Some(StreamEvent::Raw(r#"{"error":{"message":"bad key"}}"#.into()))
        );
    }

    #[test]
    fn test_bad_sse_json_is_error() {
        match OpenAiProtocol.parse_line("data: nope") {
            Some(StreamEvent::Error(message)) => {
                assert!(message.starts_with("Error parsing SSE JSON: "))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
