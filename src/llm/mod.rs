pub mod http;
pub mod protocol;
pub mod types;

pub use protocol::{ChatBackend, ChatProtocol};
pub use types::{ChatMessage, ChatRequest, MessageRole, RequestSpec, StreamEvent};
