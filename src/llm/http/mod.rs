//! curl 命令构建与流式响应解析
//!
//! 核心组件：
//! - `CurlCommand`: 按顺序拼装 curl 参数向量
//! - `GeminiProtocol` / `OpenAiProtocol`: 两种聊天 API 的请求构建和逐行解析
//! - `LineBuffer` / `StreamAccumulator`: 传输层使用的行切分与 `Raw` 行缓存
//!
//! 本模块不做任何 I/O，执行命令由 `transport` 负责。

pub mod command;
pub mod gemini;
pub mod openai;
pub mod stream;

pub use command::{CurlCommand, DEFAULT_PROGRAM};
pub use gemini::GeminiProtocol;
pub use openai::OpenAiProtocol;
pub use stream::{
    classify_line, extract_error_message, LineBuffer, SseLine, StreamAccumulator,
};
