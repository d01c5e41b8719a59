//! Tool catalog, direct commands, and payload formatting.

pub mod catalog;
pub mod direct;
pub mod output;
pub mod server;

pub use catalog::{ToolCatalog, ToolSchema};
pub use direct::{is_quit_command, DirectCommand, DirectTool};
pub use output::format_tool_output;
pub use server::{ToolOutput, ToolServer};
