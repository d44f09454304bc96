pub mod config;
pub mod error;
pub mod llm;
pub mod state;
pub mod translate;
pub mod transport;
pub mod utils;

pub use config::{EnvConfig, PanelConfig};
pub use error::{PanelError, Result};
pub use llm::http::{CurlCommand, LineBuffer, StreamAccumulator};
pub use llm::{
    ChatBackend, ChatMessage, ChatProtocol, ChatRequest, MessageRole, RequestSpec, StreamEvent,
};
pub use state::{
    FileSessionStore, MemorySessionStore, SessionState, SessionStateCodec, SessionStore,
};
pub use translate::{parse_translate_response, TranslateBackend, TranslateRequest};
pub use transport::{
    collect_reply, drain_reply, run_translation, stream_chat, ChatReply, CommandRunner,
    ProcessRunner,
};
pub use utils::logging;
