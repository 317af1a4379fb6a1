//! Sapphire Duck - MCP email server over stdio
//!
//! Speaks the Model Context Protocol (JSON-RPC 2.0, one message per line)
//! on stdin/stdout and exposes a local mailbox through three tools:
//! `send_email`, `read_emails` and `get_email`.
//!
//! Layers, leaves first:
//! - [`protocol::framing`] splits the byte stream into lines
//! - [`protocol::codec`] turns lines into typed JSON-RPC messages
//! - [`session`] enforces the initialize handshake
//! - [`registry`] lists and dispatches tools
//! - [`protocol::stdio`] drives the whole thing over stdin/stdout

pub mod config;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod startup;
pub mod tools;

pub use config::Config;
pub use registry::{Tool, ToolError, ToolRegistry};
pub use server::McpServer;
pub use session::{Session, SessionState};
