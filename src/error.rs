use thiserror::Error;

pub type Result<T> = std::result::Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
    /// 缺少必需的凭据或配置项
    #[error("{0}")]
    Configuration(String),
    /// 流数据块或响应体不是合法 JSON
    #[error("{0}")]
    Parse(String),
    /// 上游 API 在 `error` / `message` 字段中返回的错误
    #[error("{0}")]
    Upstream(String),
    /// 已知后端，但响应结构无法识别
    #[error("{0}")]
    UnknownFormat(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PanelError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unknown_format() -> Self {
        Self::UnknownFormat("Unknown backend or format".to_string())
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
