//! Spawning the tool server as a child process speaking MCP on stdio.

use rmcp::transport::TokioChildProcess;
use tokio::process::Command;

use crate::config::StdioServerConfig;
use crate::error::SqlPilotError;

impl StdioServerConfig {
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command.args(&self.args).envs(&self.env).kill_on_drop(true);
        command
    }

    pub(crate) fn spawn(&self) -> Result<TokioChildProcess, SqlPilotError> {
        TokioChildProcess::new(self.command()).map_err(|error| {
            SqlPilotError::tool_server(
                "spawn",
                format!("failed to start '{}': {error}", self.display_command()),
            )
        })
    }
}
