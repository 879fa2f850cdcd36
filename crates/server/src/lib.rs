//! Model Context Protocol surface.
//!
//! Newline-delimited JSON-RPC 2.0 over stdin/stdout. Protocol frames own
//! stdout; diagnostics go to stderr via tracing.

pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;

#[cfg(test)]
mod testutil;

pub use handlers::{ToolDispatcher, ToolError};
pub use server::{handle_request, serve_stdio, SERVER_NAME};
