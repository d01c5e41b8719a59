//! Interactive read-eval-print loop over a [`Session`].

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::agent::Session;
use crate::error::SqlPilotError;
use crate::tools::{format_tool_output, is_quit_command, DirectCommand};

const PROMPT: &str = "sqlpilot> ";

/// Where the REPL writes its transcript, if anywhere.
#[derive(Debug, Clone, Default)]
pub struct ReplOptions {
    pub transcript: Option<PathBuf>,
}

/// Read lines until EOF or a quit word. Question failures are reported and
/// the loop continues; only I/O errors on the terminal end it.
pub async fn run_repl<R, W>(
    session: &mut Session,
    input: R,
    output: &mut W,
    options: &ReplOptions,
) -> Result<(), SqlPilotError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    writeln!(
        output,
        "Ask a question about the database. Direct commands: read_query <sql>, list_tables, describe_table <name>. Type 'quit' to exit."
    )?;

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_quit_command(line) {
            break;
        }

        if let Some(command) = DirectCommand::parse(line) {
            match session.run_direct(&command).await {
                Ok(result) if result.is_error => writeln!(output, "Error: {}", result.text)?,
                Ok(result) => writeln!(output, "{}", format_tool_output(&result.text))?,
                Err(err) => writeln!(output, "Error: {err}")?,
            }
            continue;
        }

        match session.ask(line).await {
            Ok(answer) => writeln!(output, "{}", answer.text)?,
            Err(err) => writeln!(output, "Error: {err}")?,
        }

        if let Some(path) = &options.transcript {
            if let Err(err) = session.save(path) {
                warn!(path = %path.display(), error = %err, "failed to write transcript");
            }
        }
    }

    Ok(())
}
