//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches into the chat
//! loop or the configuration commands.

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::logging::init_tracing;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "sidechat")]
#[command(about = "A terminal chat interface with a conversation sidebar")]
#[command(
    long_about = "Sidechat is a full-screen terminal chat interface. Conversations live in a \
sidebar of threads; assistant replies stream into the thread they were asked \
from, even while you browse other threads.\n\n\
The backend is a plain HTTP endpoint (GET /chat?input=...&session_id=...) \
streaming raw text. A per-client session identifier is created on first \
launch and reused across runs.\n\n\
Controls:\n\
  Type              Enter your message in the composer\n\
  Enter             Send the message\n\
  Shift+Enter       Insert a new line\n\
  Ctrl+N            New chat\n\
  Ctrl+X            Delete the current chat (disabled for the last one)\n\
  Alt+Up/Down       Switch between chats\n\
  Ctrl+B            Collapse or expand the sidebar\n\
  Up/Down/Mouse     Scroll through the transcript\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend origin, e.g. http://localhost:8000 (overrides the config)
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Append a plain-text transcript of the conversation to this file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set; omit to print the current configuration
        value: Option<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing()?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let server_url = args.server.unwrap_or_else(|| config.effective_server_url());
            run_chat(server_url, args.log).await
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "server-url" => match value {
                    Some(value) => {
                        config.server_url = Some(value.clone());
                        config.save()?;
                        println!("Set server-url to: {value}");
                    }
                    None => config.print_all(),
                },
                _ => {
                    eprintln!("Unknown config key: {key}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "server-url" => {
                    config.server_url = None;
                    config.save()?;
                    println!("Unset server-url");
                }
                _ => {
                    eprintln!("Unknown config key: {key}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn server_flag_is_global() {
        let args = Args::parse_from(["sidechat", "chat", "--server", "http://example:9000"]);
        assert_eq!(args.server.as_deref(), Some("http://example:9000"));
    }

    #[test]
    fn set_without_value_parses_for_config_display() {
        let args = Args::parse_from(["sidechat", "set", "server-url"]);
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key, "server-url");
                assert!(value.is_none());
            }
            _ => panic!("expected set subcommand"),
        }
    }

    #[test]
    fn defaults_to_chat_subcommand() {
        let args = Args::parse_from(["sidechat"]);
        assert!(args.command.is_none());
        assert!(args.server.is_none());
    }
}
