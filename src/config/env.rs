use crate::error::{PanelError, Result};
use std::env;

pub const DEBUG_ENV: &str = "ASSISTANT_PANEL_DEBUG";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 解析 API key
    ///
    /// 优先级：
    /// 1. `${VAR_NAME}` 形式，从对应环境变量读取
    /// 2. 空值时读取 `default_env_var`，未设置返回 `None`（部分后端不需要 key）
    /// 3. 其它情况原样返回
    pub fn resolve_api_key(api_key: &str, default_env_var: Option<&str>) -> Result<Option<String>> {
        let api_key = api_key.trim();
        if let Some(name) = api_key.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            return Self::get_env(name).map(Some);
        }
        if api_key.is_empty() {
            return Ok(default_env_var.and_then(Self::get_env_optional));
        }
        Ok(Some(api_key.to_string()))
    }

    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            PanelError::configuration(format!("environment variable `{key}` is not set"))
        })
    }

    /// 获取可选的环境变量，空字符串视为未设置
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    pub fn is_debug_mode() -> bool {
        env::var(DEBUG_ENV).is_ok()
    }
}
