use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::session::{SessionState, SessionStateCodec};
use crate::error::Result;

/// 会话状态存储 trait
///
/// 存储的是编码后的文本，`load` 和 `save` 都经过 `SessionStateCodec`。
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionState>>;
    async fn save(&self, state: &SessionState, max_history: usize) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// 内存存储实现
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次保存的原始文本
    pub fn raw(&self) -> Option<String> {
        self.inner.read().clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        match self.inner.read().as_deref() {
            Some(raw) => SessionStateCodec::decode(raw),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &SessionState, max_history: usize) -> Result<()> {
        let encoded = state.encode(max_history)?;
        *self.inner.write() = Some(encoded);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.write().take();
        Ok(())
    }
}

/// JSON 文件存储
///
/// 写入先落到同目录的临时文件再 rename，避免保存中途退出留下半个文件。
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => SessionStateCodec::decode(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved session state");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &SessionState, max_history: usize) -> Result<()> {
        let encoded = state.encode(max_history)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, encoded).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(
            path = %self.path.display(),
            messages = state.messages.len(),
            "saved session state"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
