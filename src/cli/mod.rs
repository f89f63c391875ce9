//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::{Config, ConfigKey};
use crate::core::session::{SessionBootstrap, SessionOptions};
use crate::core::settings::Temperature;
use crate::logging::{self, LogTarget};
use crate::ui::chat_loop::run_chat;
use crate::utils::url::resolve_host;

#[derive(Parser, Debug)]
#[command(name = "ollama-chat", version)]
#[command(about = "A terminal chat client for a local Ollama server")]
#[command(
    long_about = "ollama-chat is a full-screen terminal chat client for models served by a local \
Ollama instance. Replies stream in as they are generated, and you can keep several \
independent conversations open in one session.\n\n\
Server:\n\
  --host, then OLLAMA_HOST, then the `host` config key, then http://localhost:11434\n\n\
Controls:\n\
  Enter             Send the message\n\
  Tab               Switch between Chat, Settings and History\n\
  Ctrl+N            Start a new conversation\n\
  PageUp/PageDown   Select the previous/next conversation\n\
  F2                Cycle through installed models\n\
  F3/F4             Lower/raise the temperature by 0.1\n\
  Esc               Stop the reply that is streaming\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with (must be installed on the server)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Ollama server address, e.g. localhost:11434
    #[arg(long, global = true, value_name = "URL")]
    pub host: Option<String>,

    /// Sampling temperature between 0.1 and 2.0
    #[arg(short = 't', long, global = true, value_name = "TEMP")]
    pub temperature: Option<Temperature>,

    /// Append the chat transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Write diagnostics to this file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List the models installed on the server
    Models,
    /// Send a single prompt and print the reply without the TUI
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Set a configuration value, or print the configuration without arguments
    Set {
        /// Configuration key: host, default-model or temperature
        key: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            host: self.host.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            log_file: self.log.clone(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.as_ref().unwrap_or(&Commands::Chat);

    let log_target = match (command, &args.log_file) {
        (_, Some(path)) => LogTarget::File(path.clone()),
        (Commands::Chat, None) => match logging::default_log_path() {
            Some(path) => LogTarget::File(path),
            None => LogTarget::Stderr,
        },
        (_, None) => LogTarget::Stderr,
    };
    if let Err(err) = logging::init(log_target) {
        eprintln!("⚠️  Diagnostics logging disabled: {err}");
    }

    match command {
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let Some(key) = key else {
                config.print_all();
                return Ok(());
            };
            let key: ConfigKey = key.parse()?;
            if value.is_empty() {
                config.print_all();
                return Ok(());
            }
            let message = config.set_value(key, &value.join(" "))?;
            config.save()?;
            println!("{message}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            let key: ConfigKey = key.parse()?;
            let message = config.unset_value(key);
            config.save()?;
            println!("{message}");
            Ok(())
        }
        Commands::Models => {
            let config = Config::load()?;
            let env_host = std::env::var("OLLAMA_HOST").ok();
            let host = resolve_host(
                args.host.as_deref(),
                env_host.as_deref(),
                config.host.as_deref(),
            );
            list_models(&host, &config).await
        }
        Commands::Say { prompt } => {
            let config = Config::load()?;
            let session = SessionBootstrap::connect(args.session_options(), &config).await?;
            run_say(prompt.clone(), session).await
        }
        Commands::Chat => {
            let config = Config::load()?;
            let session = SessionBootstrap::connect(args.session_options(), &config).await?;
            run_chat(session).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_chat_with_globals() {
        let args = Args::try_parse_from(["ollama-chat", "-m", "llama3.2", "-t", "1.5"])
            .expect("parse");
        assert_eq!(args.command, None);
        assert_eq!(args.model.as_deref(), Some("llama3.2"));
        assert_eq!(args.temperature.map(Temperature::value), Some(1.5));
    }

    #[test]
    fn say_collects_the_whole_prompt() {
        let args = Args::try_parse_from([
            "ollama-chat",
            "say",
            "--host",
            "gpu-box",
            "why",
            "is",
            "the",
            "sky",
            "blue?",
        ])
        .expect("parse");
        assert_eq!(args.host.as_deref(), Some("gpu-box"));
        match args.command {
            Some(Commands::Say { prompt }) => {
                assert_eq!(prompt.join(" "), "why is the sky blue?")
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_temperature_is_rejected_by_the_parser() {
        assert!(Args::try_parse_from(["ollama-chat", "--temperature", "2.5"]).is_err());
    }

    #[test]
    fn set_accepts_multi_word_values() {
        let args = Args::try_parse_from(["ollama-chat", "set", "host", "localhost:11434"])
            .expect("parse");
        assert_eq!(
            args.command,
            Some(Commands::Set {
                key: Some("host".into()),
                value: vec!["localhost:11434".into()],
            })
        );
    }
}
