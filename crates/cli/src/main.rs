//! Courier CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: read an optional TOML file (`--config`), then
//!    apply `--token` / `COURIER_BOT_TOKEN` and the other flags on top, and
//!    validate the result.
//! 2. **Wire observability**: JSON `tracing` output on stderr filtered by
//!    `RUST_LOG`, plus OTLP span export when `OTEL_EXPORTER_OTLP_ENDPOINT`
//!    is set.
//! 3. **Construct the client**: one [`client::Bot`] over the HTTPS transport.
//! 4. **Run one command**: issue the call, print the decoded result as
//!    pretty JSON on stdout. Ctrl-C cancels the call and releases its
//!    capacity.

mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Context;
use botapi::methods::{DeleteMessages, GetChatMember, GetMe, SendDocument, SendMessage};
use botapi::{ChatId, FileId, InputFile, Method, MessageId, ParseMode, UserId};
use clap::{Parser, Subcommand, ValueEnum};
use client::{retry_rate_limited, Bot, BotToken, ClientConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Rate-limited Bot API client")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bot token; overrides the configuration file.
    #[arg(long, env = "COURIER_BOT_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Bot API server; overrides the configuration file.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use the platform's test environment.
    #[arg(long, global = true)]
    test_environment: bool,

    /// Wait out flood-control responses instead of failing.
    #[arg(long, global = true)]
    retry: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the bot's own account.
    GetMe,

    /// Send a text message.
    SendMessage {
        /// Numeric chat id or @channelusername.
        #[arg(long, allow_hyphen_values = true)]
        chat: ChatId,
        #[arg(long)]
        text: String,
        #[arg(long, value_enum)]
        parse_mode: Option<ParseModeArg>,
        /// Deliver without a notification sound.
        #[arg(long)]
        silent: bool,
    },

    /// Send a document by local path, URL or file id.
    SendDocument {
        #[arg(long, allow_hyphen_values = true)]
        chat: ChatId,
        /// A local file is uploaded; an http(s) URL or a file id is sent as a reference.
        #[arg(long)]
        document: String,
        #[arg(long)]
        caption: Option<String>,
    },

    /// Show a user's membership in a chat.
    GetChatMember {
        #[arg(long, allow_hyphen_values = true)]
        chat: ChatId,
        #[arg(long)]
        user: i64,
    },

    /// Delete messages from a chat.
    DeleteMessages {
        #[arg(long, allow_hyphen_values = true)]
        chat: ChatId,
        #[arg(long = "id", required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParseModeArg {
    MarkdownV2,
    Html,
    Markdown,
}

impl From<ParseModeArg> for ParseMode {
    fn from(value: ParseModeArg) -> Self {
        match value {
            ParseModeArg::MarkdownV2 => ParseMode::MarkdownV2,
            ParseModeArg::Html => ParseMode::Html,
            ParseModeArg::Markdown => ParseMode::Markdown,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Layout of the `--config` file: client settings at the top level plus a
/// `[retry]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    #[serde(flatten)]
    client: ClientConfig,
    retry: RetryConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<FileConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => FileConfig::default(),
    };
    if let Some(token) = &cli.token {
        config.client.token = BotToken::new(token.clone());
    }
    if let Some(api_url) = &cli.api_url {
        config.client.api_url = api_url.clone();
    }
    if cli.test_environment {
        config.client.test_environment = true;
    }
    config.client.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Everything a command needs to issue one call.
struct Runner {
    bot: Bot,
    retry: Option<RetryConfig>,
    cancel: CancellationToken,
}

impl Runner {
    async fn run<M>(&self, method: &M) -> anyhow::Result<()>
    where
        M: Method,
        M::Response: Serialize,
    {
        let result = match &self.retry {
            Some(retry) => {
                retry_rate_limited(retry, &self.cancel, || {
                    self.bot.call_with_cancel(method, &self.cancel)
                })
                .await
            }
            None => self.bot.call_with_cancel(method, &self.cancel).await,
        };
        let response = result.with_context(|| format!("{} failed", M::NAME))?;
        info!(method = M::NAME, "call succeeded");
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}

async fn document(source: String) -> anyhow::Result<InputFile> {
    if source.starts_with("https://") || source.starts_with("http://") {
        return Ok(InputFile::url(source));
    }
    let path = Path::new(&source);
    if path.is_file() {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned());
        return Ok(InputFile::upload(file_name, bytes));
    }
    let file_id = FileId::new(source).context("document is neither a file, a URL nor a file id")?;
    Ok(InputFile::FileId(file_id))
}

async fn execute(runner: &Runner, command: Command) -> anyhow::Result<()> {
    match command {
        Command::GetMe => runner.run(&GetMe).await,
        Command::SendMessage {
            chat,
            text,
            parse_mode,
            silent,
        } => {
            let mut request = SendMessage::new(chat, text);
            request.parse_mode = parse_mode.map(ParseMode::from);
            request.disable_notification = silent;
            runner.run(&request).await
        }
        Command::SendDocument {
            chat,
            document: source,
            caption,
        } => {
            let mut request = SendDocument::new(chat, document(source).await?);
            request.caption = caption;
            runner.run(&request).await
        }
        Command::GetChatMember { chat, user } => {
            runner
                .run(&GetChatMember {
                    chat_id: chat,
                    user_id: UserId::new(user),
                })
                .await
        }
        Command::DeleteMessages { chat, ids } => {
            runner
                .run(&DeleteMessages {
                    chat_id: chat,
                    message_ids: ids.into_iter().map(MessageId::new).collect(),
                })
                .await
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init()?;

    let result = async {
        let config = load_config(&cli)?;
        let bot = Bot::new(config.client)?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted; cancelling the call");
                    cancel.cancel();
                }
            }
        });

        let runner = Runner {
            bot,
            retry: cli.retry.then_some(config.retry),
            cancel,
        };
        execute(&runner, cli.command).await
    }
    .await;

    telemetry.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("courier").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn chat_ids_parse_from_numbers_and_usernames() {
        let parsed = cli(&["send-message", "--chat", "@news", "--text", "hi", "--token", "1:x"]);
        match parsed.command {
            Command::SendMessage { chat, .. } => assert_eq!(chat, ChatId::Username("@news".into())),
            other => panic!("unexpected command: {other:?}"),
        }

        let parsed = cli(&["get-chat-member", "--chat", "-100123", "--user", "7"]);
        assert!(matches!(
            parsed.command,
            Command::GetChatMember { chat: ChatId::Id(-100_123), user: 7 }
        ));
    }

    #[test]
    fn parse_mode_flag_maps_to_the_wire_value() {
        let parsed = cli(&["send-message", "--chat", "5", "--text", "<b>hi</b>", "--parse-mode", "html"]);
        let Command::SendMessage { parse_mode, .. } = parsed.command else {
            panic!("expected send-message");
        };
        let mode = parse_mode.map(ParseMode::from);
        assert_eq!(mode, Some(ParseMode::Html));
        assert_eq!(serde_json::to_string(&mode).unwrap(), r#""HTML""#);
    }

    #[test]
    fn flags_override_the_config_file() {
        let mut file = tempfile();
        writeln!(
            file.1,
            r#"
            token = "1:from-file"
            api_url = "http://localhost:8081"

            [rate.global]
            capacity = 5
            interval_ms = 2000

            [retry]
            max_attempts = 7
            "#
        )
        .unwrap();

        let path = file.0.to_str().unwrap().to_owned();
        let parsed = cli(&["--config", &path, "--token", "2:from-flag", "get-me"]);
        let config = load_config(&parsed).unwrap();
        assert_eq!(config.client.token, BotToken::new("2:from-flag"));
        assert_eq!(config.client.api_url, "http://localhost:8081");
        assert_eq!(config.client.rate.global.capacity, 5);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.max_wait_secs, RetryConfig::default().max_wait_secs);

        std::fs::remove_file(&file.0).unwrap();
    }

    #[test]
    fn missing_token_is_rejected() {
        let parsed = Cli {
            token: None,
            ..cli(&["get-me"])
        };
        let err = load_config(&parsed).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    fn tempfile() -> (PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!("courier-{}.toml", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
