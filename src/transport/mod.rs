//! 子进程传输层
//!
//! 执行 `RequestSpec::args` 描述的命令，把 stdout 逐行交给聊天协议解析，
//! 或者一次性读取完整响应交给翻译解析器。丢弃事件流即终止子进程。

use std::collections::VecDeque;
use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::error::{PanelError, Result};
use crate::llm::http::{LineBuffer, StreamAccumulator};
use crate::llm::{ChatBackend, RequestSpec, StreamEvent};
use crate::translate::{TranslateBackend, TranslateRequest};

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const READ_CHUNK_SIZE: usize = 8192;

/// 命令执行器
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 启动命令，按到达顺序返回 stdout 的每一行
    fn spawn_lines(&self, args: &[String]) -> Result<LineStream>;

    /// 执行命令直到结束，返回完整 stdout
    async fn run(&self, args: &[String]) -> Result<String>;
}

/// 基于 `tokio::process` 的执行器
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(args: &[String]) -> Result<Command> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| PanelError::Transport("empty command line".to_string()))?;
        let mut command = Command::new(program);
        command.args(rest).stdin(Stdio::null()).kill_on_drop(true);
        Ok(command)
    }
}

/// 子进程 stdout 的读取状态
///
/// 按字节块读取，由 `LineBuffer` 切行；非 UTF-8 字节按 lossy 方式替换，不会中断流。
struct ChildLines {
    child: Child,
    stdout: ChildStdout,
    buffer: LineBuffer,
    pending: VecDeque<String>,
    eof: bool,
}

impl ChildLines {
    async fn next_line(&mut self) -> Option<Result<String>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            if self.eof {
                return match self.child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some(Err(PanelError::Transport(format!(
                        "command exited with {status}"
                    )))),
                    Err(e) => Some(Err(PanelError::from(e))),
                };
            }
            match self.stdout.read(&mut chunk).await {
                Ok(0) => {
                    self.eof = true;
                    self.pending.extend(self.buffer.finish());
                }
                Ok(n) => self.pending.extend(self.buffer.push(&chunk[..n])),
                Err(e) => return Some(Err(PanelError::from(e))),
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn spawn_lines(&self, args: &[String]) -> Result<LineStream> {
        let mut child = Self::command(args)?
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PanelError::Transport("child stdout unavailable".to_string()))?;
        let state = ChildLines {
            child,
            stdout,
            buffer: LineBuffer::new(),
            pending: VecDeque::new(),
            eof: false,
        };

        Ok(Box::pin(futures::stream::unfold(
            Some(state),
            |state: Option<ChildLines>| async move {
                let mut state = state?;
                match state.next_line().await? {
                    Ok(line) => Some((Ok(line), Some(state))),
                    Err(e) => Some((Err(e), None)),
                }
            },
        )))
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        let output = Self::command(args)?.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PanelError::Transport(format!(
                "command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// 执行流式聊天请求
///
/// 每行经 `ChatBackend::parse_stream_line` 解析，`Raw` 行由 `StreamAccumulator` 缓存，
/// 流结束后若缓存内容是错误 JSON 则补发一个 `Error` 事件。
/// 传输错误也以 `Error` 事件结束流。
#[instrument(skip(runner, spec), fields(url_len = spec.url.len()))]
pub fn stream_chat(
    runner: &dyn CommandRunner,
    backend: ChatBackend,
    spec: &RequestSpec,
) -> Result<EventStream> {
    let lines = runner.spawn_lines(&spec.args)?;
    debug!(%backend, "chat stream started");

    let events = futures::stream::unfold(
        (lines, StreamAccumulator::new(), false),
        move |(mut lines, mut acc, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match lines.next().await {
                    Some(Ok(line)) => {
                        let event = backend
                            .parse_stream_line(&line)
                            .and_then(|event| acc.push(event));
                        if let Some(event) = event {
                            return Some((event, (lines, acc, false)));
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "chat transport failed");
                        let event = acc
                            .finish()
                            .unwrap_or_else(|| StreamEvent::Error(e.to_string()));
                        return Some((event, (lines, acc, true)));
                    }
                    None => {
                        return acc.finish().map(|event| (event, (lines, acc, true)));
                    }
                }
            }
        },
    );
    Ok(Box::pin(events))
}

/// 执行一次翻译请求：构建命令、执行、解析
#[instrument(skip(runner, request), fields(target_lang = %request.target_lang))]
pub async fn run_translation(
    runner: &dyn CommandRunner,
    backend: TranslateBackend,
    request: &TranslateRequest,
    program: &str,
) -> Result<String> {
    let spec = backend.build_command_with(request, program)?;
    let body = runner.run(&spec.args).await?;
    backend.parse_response(&body)
}

/// 一次聊天流的收集结果
///
/// 上游报错时 `text` 仍保留报错前已收到的内容，调用方可以先持久化再上报错误。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub error: Option<String>,
}

impl ChatReply {
    pub fn into_result(self) -> Result<String> {
        match self.error {
            Some(message) => Err(PanelError::Upstream(message)),
            None => Ok(self.text),
        }
    }
}

/// 消费事件流直到 `Done`、`Error` 或流结束，每个事件先交给 `on_event`
pub async fn drain_reply<F>(mut events: EventStream, mut on_event: F) -> ChatReply
where
    F: FnMut(&StreamEvent),
{
    let mut reply = ChatReply::default();
    while let Some(event) = events.next().await {
        on_event(&event);
        match event {
            StreamEvent::Content(text) => reply.text.push_str(&text),
            StreamEvent::Done => break,
            StreamEvent::Error(message) => {
                reply.error = Some(message);
                break;
            }
            StreamEvent::Raw(_) => {}
        }
    }
    reply
}

/// 把事件流收集成完整回复；遇到 `Error` 立即返回
pub async fn collect_reply(events: EventStream) -> Result<String> {
    drain_reply(events, |_| {}).await.into_result()
}
