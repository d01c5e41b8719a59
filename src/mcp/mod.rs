//! Model Context Protocol tool server client.

pub mod client;
pub mod transport;

pub use client::MCPToolServer;
pub use crate::config::StdioServerConfig;
