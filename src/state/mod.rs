// 会话状态持久化

mod session;
mod store;

pub use session::{SessionState, SessionStateCodec, DEFAULT_MAX_HISTORY, DEFAULT_TAB};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
