use std::io::Write;
use std::path::PathBuf;

use assistant_panel::utils::LoggingConfig;
use assistant_panel::{
    drain_reply, run_translation, stream_chat, ChatBackend, ChatMessage, FileSessionStore,
    PanelConfig, ProcessRunner, SessionState, SessionStore, StreamEvent,
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "assistant-panel", version, about = "Assistant panel backend CLI", author)]
struct Cli {
    /// Panel config (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the curl invocation for a chat request without running it
    Command {
        #[arg(long)]
        state: Option<PathBuf>,
        message: String,
    },
    /// Send a message and stream the reply to stdout
    Chat {
        /// Session file to read history from and append the exchange to
        #[arg(long)]
        state: Option<PathBuf>,
        /// Print raw stream events instead of text
        #[arg(long)]
        events: bool,
        message: String,
    },
    /// Parse streamed lines from stdin and print one JSON event per line
    Parse {
        #[arg(long, default_value = "gemini")]
        backend: ChatBackend,
    },
    /// Translate text with the configured backend and print the result
    Translate {
        /// Target language; falls back to the config's target language
        #[arg(long)]
        to: Option<String>,
        /// Source language; auto-detected when omitted
        #[arg(long)]
        from: Option<String>,
        text: String,
    },
    /// Show a persisted session file
    State { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PanelConfig::from_file(path)?,
        None => PanelConfig::default(),
    };

    match cli.command {
        Command::Command { state, message } => handle_command(&config, state, message).await?,
        Command::Chat {
            state,
            events,
            message,
        } => handle_chat(&config, state, events, message).await?,
        Command::Parse { backend } => handle_parse(backend).await?,
        Command::Translate { to, from, text } => {
            handle_translate(&config, to, from, text).await?
        }
        Command::State { path } => handle_state(path).await?,
    }
    Ok(())
}

async fn load_session(path: Option<&PathBuf>) -> anyhow::Result<SessionState> {
    let Some(path) = path else {
        return Ok(SessionState::default());
    };
    Ok(FileSessionStore::new(path).load().await?.unwrap_or_default())
}

async fn handle_command(
    config: &PanelConfig,
    state: Option<PathBuf>,
    message: String,
) -> anyhow::Result<()> {
    let mut session = load_session(state.as_ref()).await?;
    session.push_message(ChatMessage::user(message));
    let request = config.chat_request(session.messages)?;
    let spec = config
        .chat_backend()
        .build_command_with(&request, config.program())?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

async fn handle_chat(
    config: &PanelConfig,
    state: Option<PathBuf>,
    events: bool,
    message: String,
) -> anyhow::Result<()> {
    let mut session = load_session(state.as_ref()).await?;
    session.push_message(ChatMessage::user(message));

    let backend = config.chat_backend();
    let request = config.chat_request(session.messages.clone())?;
    let spec = backend.build_command_with(&request, config.program())?;
    let stream = stream_chat(&ProcessRunner, backend, &spec)?;

    let reply = drain_reply(stream, |event| {
        if events {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode stream event"),
            }
        } else if let StreamEvent::Content(text) = event {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
    })
    .await;
    if !events {
        println!();
    }

    // 先保存已收到的部分回复，再上报上游错误
    if let Some(path) = state {
        if !reply.text.is_empty() {
            session.push_message(ChatMessage::assistant(reply.text.clone()));
        }
        FileSessionStore::new(path)
            .save(&session, config.max_history)
            .await?;
    }
    reply.into_result()?;
    Ok(())
}

async fn handle_parse(backend: ChatBackend) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = backend.parse_stream_line(&line) {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}

async fn handle_translate(
    config: &PanelConfig,
    to: Option<String>,
    from: Option<String>,
    text: String,
) -> anyhow::Result<()> {
    let request = config.translate_request(&text, to.as_deref(), from.as_deref())?;
    let translated = run_translation(
        &ProcessRunner,
        config.translate_backend(),
        &request,
        config.program(),
    )
    .await?;
    println!("{translated}");
    Ok(())
}

async fn handle_state(path: PathBuf) -> anyhow::Result<()> {
    let store = FileSessionStore::new(&path);
    match store.load().await? {
        Some(state) => {
            println!(
                "{} messages, tab `{}`, input {:?} (cursor {})",
                state.messages.len(),
                state.active_tab,
                state.chat_input_text,
                state.chat_input_cursor_position
            );
            for message in &state.messages {
                println!("[{}] {}", message.role.as_str(), message.content);
            }
        }
        None => println!("No saved state at `{}`", path.display()),
    }
    Ok(())
}
