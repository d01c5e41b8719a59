//! sqlpilot: ask questions about a SQLite database in plain language.
//!
//! A local Ollama model decides which database tools to call; an MCP tool
//! server (by default `mcp-server-sqlite`, spawned over stdio) executes them.
//! The [`agent_loop::Orchestrator`] relays tool calls and results between the
//! two until the model produces a final answer or the round-trip budget runs
//! out.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlpilot::prelude::*;
//!
//! # async fn example() -> sqlpilot::error::Result<()> {
//! let config = SqlPilotConfig::load(None)?;
//! let tools = Arc::new(MCPToolServer::connect(&config.resolved_tool_server()).await?);
//! let model = Arc::new(OllamaEndpoint::from_config(&config)?);
//! let orchestrator = Orchestrator::discover(model, tools).await?.with_config(&config);
//!
//! let mut session = Session::new(orchestrator);
//! let answer = session.ask("How many tables are there?").await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;
