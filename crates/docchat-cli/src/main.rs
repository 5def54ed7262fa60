//! docchat CLI: chat with a documentation question-answering backend

use clap::{Parser, Subcommand};
use docchat_engine::config::{BACKEND_URL_ENV, CONFIG_DIR};
use docchat_engine::{
    dispatch, CancellationToken, ChatSession, Completion, Config, ConfigError, ConversationStore,
    Emitter, HttpBackend, MemoryStore, Submission,
};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal client for a documentation question-answering service
#[derive(Parser)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the backend (the client posts to <URL>/ask)
    #[arg(long, global = true, env = BACKEND_URL_ENV)]
    backend_url: Option<String>,

    /// Config file [default: .docchat/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// Ask one question in a fresh conversation
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Output as JSON, including retrieved sources
        #[arg(long)]
        json: bool,
    },

    /// Line-mode chat over stdin (/new starts a new conversation)
    Chat,

    /// Create .docchat/ and a default config
    Init,

    /// Print the effective configuration
    Config,
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    /// A log file, so the TUI screen stays clean.
    File(PathBuf),
}

const LOG_FILE: &str = "docchat.log";

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::default_path(Path::new(".")));

    let target = match cli.command {
        None | Some(Commands::Tui) => LogTarget::File(log_path(&config_path)),
        Some(_) => LogTarget::Stderr,
    };
    if let Err(e) = init_tracing(&target, cli.debug) {
        eprintln!("Warning: logging disabled: {e}");
    }

    match cli.command {
        Some(Commands::Init) => cmd_init(&config_path),
        Some(Commands::Config) => cmd_config(&config_path, cli.backend_url),
        command => {
            let config = match load_config(&config_path, cli.backend_url) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to load {}: {e}", config_path.display());
                    std::process::exit(1);
                }
            };
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to create tokio runtime: {e}");
                    std::process::exit(1);
                }
            };
            let code = match command {
                Some(Commands::Ask { question, json }) => {
                    rt.block_on(cmd_ask(&config, &question.join(" "), json))
                }
                Some(Commands::Chat) => rt.block_on(cmd_chat(&config)),
                _ => match rt.block_on(docchat_tui::run_tui(&config)) {
                    Ok(()) => 0,
                    Err(e) => {
                        eprintln!("Error: {e}");
                        1
                    }
                },
            };
            std::process::exit(code);
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the default level; `--debug` forces `debug`.
fn init_tracing(target: &LogTarget, debug: bool) -> std::io::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
    }
    Ok(())
}

/// The TUI log sits next to the config file.
fn log_path(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(LOG_FILE),
        _ => Path::new(CONFIG_DIR).join(LOG_FILE),
    }
}

fn load_config(path: &Path, backend_url: Option<String>) -> Result<Config, ConfigError> {
    Ok(Config::load_or_default(path)?.with_backend_url(backend_url))
}

fn cmd_init(config_path: &Path) {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return;
    }

    match Config::default().save(config_path) {
        Ok(()) => println!("Created {}", config_path.display()),
        Err(e) => {
            eprintln!("Failed to write config: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config(config_path: &Path, backend_url: Option<String>) {
    match load_config(config_path, backend_url) {
        Ok(config) => print_json(&config),
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

fn http_backend(config: &Config) -> Option<HttpBackend> {
    match HttpBackend::new(&config.backend_url, config.request_timeout()) {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("Failed to create HTTP client: {e}");
            None
        }
    }
}

/// One question in a fresh conversation. Returns the exit code.
async fn cmd_ask(config: &Config, question: &str, json: bool) -> i32 {
    let Some(backend) = http_backend(config) else {
        return 1;
    };

    let mut session = ChatSession::new(MemoryStore::new());
    let pending = match session.submit(question) {
        Submission::NeedsConversation => {
            let id = session.create_conversation();
            session.conversation_created(id)
        }
        Submission::Ready(pending) => Some(pending),
        Submission::Ignored(_) => None,
    };
    let Some(pending) = pending else {
        eprintln!("Error: question is empty");
        return 1;
    };

    let request = pending.request().clone();
    let Some(outcome) = dispatch(&backend, &request, &CancellationToken::new()).await else {
        return 1;
    };

    let code = match &outcome {
        Ok(answer) if json => {
            let sources: Vec<_> = answer
                .sources
                .iter()
                .map(|doc| json!({ "file_name": doc.file_name, "page_content": doc.page_content }))
                .collect();
            let value = json!({ "question": question, "answer": answer.text, "sources": sources });
            print_json(&value);
            0
        }
        Ok(answer) => {
            println!("{}", docchat_engine::display_text(&answer.text));
            0
        }
        Err(failure) if json => {
            let value = json!({ "question": question, "error": failure.message() });
            print_json(&value);
            1
        }
        Err(failure) => {
            eprintln!("{failure}");
            1
        }
    };

    if let Err(e) = session.complete(pending, outcome) {
        tracing::warn!(error = %e, "Could not record answer");
    }
    code
}

/// Line-mode chat. Each line is a prompt; `/new` starts a new conversation.
async fn cmd_chat(config: &Config) -> i32 {
    let Some(backend) = http_backend(config) else {
        return 1;
    };

    let mut session = ChatSession::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("docchat: asking {} (/new for a new chat, Ctrl+D to exit)", config.backend_url);
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {e}");
                return 1;
            }
        };

        if line.trim() == "/new" {
            session.clear_selection();
            println!("(new chat)");
            continue;
        }

        match session.ask(&backend, &line, &cancel).await {
            Ok(Some(completion)) => print_completion(&session, &completion),
            Ok(None) => {}
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        }
    }
    0
}

fn print_completion(session: &ChatSession<MemoryStore>, completion: &Completion) {
    let Some(turn) = session
        .store()
        .get(&completion.conversation)
        .and_then(|c| c.turns().get(completion.turn_index))
    else {
        return;
    };
    match completion.emitter {
        Emitter::Error => println!("[!] {}", turn.display_text()),
        _ => println!("{}\n", turn.display_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_command_opens_tui() {
        let cli = Cli::try_parse_from(["docchat"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["docchat", "ask", "what", "is", "X?", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Ask { question, json }) => {
                assert_eq!(question.join(" "), "what is X?");
                assert!(json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["docchat", "ask"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docchat",
            "chat",
            "--backend-url",
            "http://example:9000",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://example:9000"));
        assert!(cli.debug);
    }

    #[test]
    fn test_load_config_flag_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        Config {
            backend_url: "http://from-file:1".into(),
            request_timeout_seconds: Some(5),
        }
        .save(&path)
        .unwrap();

        let from_file = load_config(&path, None).unwrap();
        assert_eq!(from_file.backend_url, "http://from-file:1");

        let overridden = load_config(&path, Some("http://flag:2".into())).unwrap();
        assert_eq!(overridden.backend_url, "http://flag:2");
        assert_eq!(overridden.request_timeout_seconds, Some(5));
    }

    #[test]
    fn test_log_file_follows_config_dir() {
        let default = Config::default_path(Path::new("."));
        assert_eq!(log_path(&default), Path::new(".").join(CONFIG_DIR).join(LOG_FILE));

        let custom = Path::new("/srv/docchat/settings.json");
        assert_eq!(log_path(custom), Path::new("/srv/docchat").join(LOG_FILE));

        assert_eq!(log_path(Path::new("config.json")), Path::new(CONFIG_DIR).join(LOG_FILE));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("none.json"), None).unwrap();
        assert_eq!(config, Config::default());
    }
}
