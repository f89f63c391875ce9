//! ollama-chat is a terminal chat client for a local Ollama server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation store, the streaming accumulator, the
//!   chat pipeline state machine, the cached model registry and persisted
//!   configuration.
//! - [`api`] defines the Ollama wire payloads for chat and model listing.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop. It only reads core state between turns and consumes pipeline
//!   events while a turn is streaming.
//! - [`cli`] parses arguments and dispatches into the chat loop or the
//!   headless subcommands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
