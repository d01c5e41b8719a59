//! Direct tool commands typed at the prompt, bypassing the model.

use std::sync::OnceLock;

use regex::Regex;
use strum::{Display, EnumString, IntoStaticStr};

use crate::types::JsonObject;

/// Database tools that can be invoked by name at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DirectTool {
    ReadQuery,
    ListTables,
    DescribeTable,
}

/// A parsed direct command.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectCommand {
    pub tool: DirectTool,
    pub argument: String,
}

impl DirectCommand {
    /// Parse `read_query <sql>`, `list_tables`, or `describe_table <name>`.
    ///
    /// Returns `None` for anything else, which is then treated as a question.
    pub fn parse(input: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(read_query|list_tables|describe_table)(?:\s+(.*))?$")
                .expect("direct command pattern is valid")
        });

        let captures = pattern.captures(input.trim())?;
        let tool = captures.get(1)?.as_str().parse().ok()?;
        let argument = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some(Self { tool, argument })
    }

    pub fn tool_name(&self) -> &'static str {
        self.tool.into()
    }

    /// Arguments in the shape the SQLite tool server expects.
    pub fn arguments(&self) -> JsonObject {
        let mut args = JsonObject::new();
        match self.tool {
            DirectTool::ReadQuery => {
                args.insert("query".into(), self.argument.clone().into());
            }
            DirectTool::DescribeTable => {
                args.insert("table_name".into(), self.argument.clone().into());
            }
            DirectTool::ListTables => {}
        }
        args
    }
}

/// Words that end an interactive session.
pub fn is_quit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "quit" | "exit" | "q")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_query_with_sql() {
        let cmd = DirectCommand::parse("read_query SELECT * FROM sqlite_master;").unwrap();
        assert_eq!(cmd.tool, DirectTool::ReadQuery);
        assert_eq!(cmd.tool_name(), "read_query");
        assert_eq!(cmd.arguments()["query"], "SELECT * FROM sqlite_master;");
    }

    #[test]
    fn parses_list_tables_without_argument() {
        let cmd = DirectCommand::parse("  list_tables ").unwrap();
        assert_eq!(cmd.tool, DirectTool::ListTables);
        assert!(cmd.arguments().is_empty());
    }

    #[test]
    fn parses_describe_table() {
        let cmd = DirectCommand::parse("describe_table categories").unwrap();
        assert_eq!(cmd.arguments()["table_name"], "categories");
    }

    #[test]
    fn questions_are_not_commands() {
        assert!(DirectCommand::parse("How many episodes are there?").is_none());
        assert!(DirectCommand::parse("list_tablesfoo").is_none());
    }

    #[test]
    fn quit_words_are_case_insensitive() {
        assert!(is_quit_command("QUIT"));
        assert!(is_quit_command(" q "));
        assert!(!is_quit_command("quite"));
    }
}
