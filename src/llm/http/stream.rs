use serde_json::Value;
use tracing::debug;

use crate::llm::types::StreamEvent;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// 单行 SSE 文本的分类结果
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Empty,
    Done,
    /// `data: ` 之后、已去除首尾空白的载荷
    Data(&'a str),
    /// 不带 `data: ` 前缀的行（已 trim）
    Other(&'a str),
}

/// 对一行输出做 SSE 分类，两种聊天协议共用
pub fn classify_line(line: &str) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() {
        return SseLine::Empty;
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(data) => {
            let data = data.trim();
            if data == DONE_SENTINEL {
                SseLine::Done
            } else {
                SseLine::Data(data)
            }
        }
        None => SseLine::Other(line),
    }
}

/// 行缓冲器
///
/// 子进程 stdout 按任意边界到达，这里把字节块切分成完整的行，
/// 未结束的尾部留在 buffer 中等待下一块。
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加数据块，返回其中所有完整的行（不含换行符）
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(data));

        let mut lines = Vec::new();
        let mut processed = 0;

        while let Some(end_pos) = self.buffer[processed..].find('\n') {
            let line_end = processed + end_pos;
            let line = self.buffer[processed..line_end].trim_end_matches('\r');
            lines.push(line.to_string());
            processed = line_end + 1;
        }

        if processed > 0 {
            self.buffer.drain(..processed);
        }

        lines
    }

    /// 流结束时取出最后一行（没有换行结尾的情况）
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

}

/// 流事件累加器，由传输层持有
///
/// 解析器本身无状态，跨行的 JSON（例如多行排版的错误响应）会以 `Raw` 事件逐行出现。
/// 累加器转发其它事件，缓存 `Raw` 行，流结束时尝试把缓存内容整体解析成上游错误。
/// 以 `:` 开头的 SSE 注释行（keep-alive）不进缓存。
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    raw: Vec<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        match event {
            StreamEvent::Raw(line) => {
                if !line.starts_with(':') {
                    self.raw.push(line);
                }
                None
            }
            other => Some(other),
        }
    }

    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.raw.is_empty() {
            return None;
        }
        // JSON 从第一个 `{` 或 `[` 开头的行开始，之前的杂行丢弃
        let start = self
            .raw
            .iter()
            .position(|line| line.starts_with('{') || line.starts_with('['));
        let text = start.map(|start| self.raw[start..].join("\n"));
        self.raw.clear();
        let text = text?;

        match serde_json::from_str::<Value>(&text) {
            Ok(json) => extract_error_message(&json).map(StreamEvent::Error),
            Err(e) => {
                debug!(error = %e, bytes = text.len(), "discarding unparseable raw output");
                None
            }
        }
    }
}

/// 从错误响应体中提取消息，兼容 `{"error":{"message"}}`、`{"error":"..."}`、`{"message":"..."}`
/// 以及 Gemini 非 SSE 模式下包在数组里的形式
pub fn extract_error_message(json: &Value) -> Option<String> {
    if let Some(first) = json.as_array().and_then(|items| items.first()) {
        return extract_error_message(first);
    }
    let message = match &json["error"] {
        Value::String(message) => Some(message.as_str()),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .or(Some("API error")),
        _ => json["message"].as_str(),
    };
    message.filter(|m| !m.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line(""), SseLine::Empty);
        assert_eq!(classify_line(" \t "), SseLine::Empty);
        assert_eq!(classify_line("data: [DONE]"), SseLine::Done);
        assert_eq!(classify_line("data:  [DONE]  "), SseLine::Done);
        assert_eq!(classify_line("data: {\"a\":1} "), SseLine::Data("{\"a\":1}"));
        assert_eq!(classify_line(": keep-alive"), SseLine::Other(": keep-alive"));
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"choi").is_empty());
        let lines = buffer.push(b"ces\":[]}\r\n\ndata: [DONE]");
        assert_eq!(lines, vec!["data: {\"choices\":[]}", ""]);
        assert_eq!(buffer.finish().as_deref(), Some("data: [DONE]"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_accumulator_forwards_non_raw() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(
            acc.push(StreamEvent::Content("a".into())),
            Some(StreamEvent::Content("a".into()))
        );
        assert_eq!(acc.push(StreamEvent::Done), Some(StreamEvent::Done));
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn test_accumulator_reassembles_multiline_error() {
        let mut acc = StreamAccumulator::new();
        for line in ["{", "\"error\": {", "\"message\": \"Incorrect API key\"", "}", "}"] {
            assert_eq!(acc.push(StreamEvent::Raw(line.into())), None);
        }
        assert_eq!(
            acc.finish(),
            Some(StreamEvent::Error("Incorrect API key".into()))
        );
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn test_accumulator_skips_keep_alive_before_error() {
        let mut acc = StreamAccumulator::new();
        let lines = [
            ": keep-alive",
            "{",
            "\"error\": {",
            ": keep-alive",
            "\"message\": \"quota exceeded\"",
            "}",
            "}",
        ];
        for line in lines {
            assert_eq!(acc.push(StreamEvent::Raw(line.into())), None);
        }
        assert_eq!(
            acc.finish(),
            Some(StreamEvent::Error("quota exceeded".into()))
        );
    }

    #[test]
    fn test_accumulator_drops_preamble_before_json() {
        let mut acc = StreamAccumulator::new();
        acc.push(StreamEvent::Raw("HTTP/1.1 401 Unauthorized".into()));
        acc.push(StreamEvent::Raw(r#"{"error": "invalid token"}"#.into()));
        assert_eq!(acc.finish(), Some(StreamEvent::Error("invalid token".into())));
    }

    #[test]
    fn test_accumulator_ignores_garbage() {
        let mut acc = StreamAccumulator::new();
        acc.push(StreamEvent::Raw("<html>502 Bad Gateway</html>".into()));
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn test_extract_error_message_shapes() {
        let json = serde_json::json!([{"error": {"code": 429, "message": "quota"}}]);
        assert_eq!(extract_error_message(&json).as_deref(), Some("quota"));
        let json = serde_json::json!({"error": "nope"});
        assert_eq!(extract_error_message(&json).as_deref(), Some("nope"));
        let json = serde_json::json!({"message": "Wrong endpoint"});
        assert_eq!(extract_error_message(&json).as_deref(), Some("Wrong endpoint"));
        let json = serde_json::json!({"candidates": []});
        assert_eq!(extract_error_message(&json), None);
    }
}
