/// 默认的 HTTP 客户端程序
pub const DEFAULT_PROGRAM: &str = "curl";

/// curl 命令行构建器
///
/// 参数按调用顺序追加，`into_args` 返回可直接执行的参数向量（第一个元素为程序名）。
///
/// ```rust
/// use assistant_panel::llm::http::CurlCommand;
///
/// let args = CurlCommand::new()
///     .silent()
///     .method("POST")
///     .header("Content-Type", "application/json")
///     .data("{}")
///     .url("https://api.example.com/v1/chat/completions")
///     .into_args();
/// assert_eq!(args[0], "curl");
/// ```
#[derive(Clone, Debug)]
pub struct CurlCommand {
    args: Vec<String>,
}

impl CurlCommand {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            args: vec![program.into()],
        }
    }

    pub fn silent(self) -> Self {
        self.flag("-s")
    }

    /// 配合 `-s` 使用，仍然把错误输出到 stderr
    pub fn show_errors(self) -> Self {
        self.flag("-S")
    }

    pub fn no_buffer(self) -> Self {
        self.flag("--no-buffer")
    }

    pub fn method(self, method: &str) -> Self {
        self.flag("-X").flag(method)
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        self.flag("-H").flag(format!("{name}: {value}"))
    }

    pub fn data(self, body: impl Into<String>) -> Self {
        self.flag("-d").flag(body)
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.flag(url)
    }

    fn flag(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

impl Default for CurlCommand {
    fn default() -> Self {
        Self::new()
    }
}
