//! Sidechat is a full-screen terminal chat client with a conversation
//! sidebar. Assistant replies stream chunk-by-chunk from a plain-HTTP chat
//! backend into the thread they were requested from.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the chat store state machine, session
//!   identity, configuration, and streaming orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`logging`] carries transcript logging and tracing diagnostics.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`]
//! for interactive sessions.

pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
