//! Configuration (layered: defaults < config file < environment < CLI flags).

pub mod prompt;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlPilotError};
use crate::types::GenerationSettings;

pub use prompt::{CORRECTIVE_PROMPT, DEFAULT_SYSTEM_PROMPT};

pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 10;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const CONFIG_FILE_NAME: &str = "config.toml";

/// How to launch the tool server as a child process speaking MCP on stdio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for StdioServerConfig {
    fn default() -> Self {
        Self::new("uvx", vec!["mcp-server-sqlite".into()])
    }
}

impl StdioServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-style rendering, for logs and error messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPilotConfig {
    pub model: String,
    pub ollama_url: String,
    pub generation: GenerationSettings,
    pub system_prompt: String,
    pub max_round_trips: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub tool_server: StdioServerConfig,
    /// Passed to the tool server as `--db-path <path>`.
    pub db_path: Option<PathBuf>,
}

impl Default for SqlPilotConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            generation: GenerationSettings::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            tool_server: StdioServerConfig::default(),
            db_path: None,
        }
    }
}

/// On-disk shape of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    model: Option<String>,
    ollama_url: Option<String>,
    temperature: Option<f64>,
    seed: Option<u64>,
    num_ctx: Option<u32>,
    system_prompt: Option<String>,
    system_prompt_file: Option<PathBuf>,
    max_round_trips: Option<usize>,
    model_timeout_secs: Option<u64>,
    tool_timeout_secs: Option<u64>,
    db_path: Option<PathBuf>,
    tool_server: Option<StdioServerConfig>,
}

impl SqlPilotConfig {
    /// Default location of the config file (`<config dir>/sqlpilot/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sqlpilot")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(default) = Self::default_path().filter(|p| p.is_file()) {
                    config.merge_file(&default)?;
                }
            }
        }

        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Merge a TOML config file over the current values.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlPilotError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&raw)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.merge(file, base_dir)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    fn merge(&mut self, file: ConfigFile, base_dir: &Path) -> Result<()> {
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(url) = file.ollama_url {
            self.ollama_url = url;
        }
        if file.temperature.is_some() {
            self.generation.temperature = file.temperature;
        }
        if file.seed.is_some() {
            self.generation.seed = file.seed;
        }
        if file.num_ctx.is_some() {
            self.generation.num_ctx = file.num_ctx;
        }
        if let Some(prompt) = file.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(prompt_file) = file.system_prompt_file {
            let prompt_path = base_dir.join(prompt_file);
            self.system_prompt = std::fs::read_to_string(&prompt_path).map_err(|e| {
                SqlPilotError::Configuration(format!(
                    "cannot read system prompt {}: {e}",
                    prompt_path.display()
                ))
            })?;
        }
        if let Some(limit) = file.max_round_trips {
            self.max_round_trips = limit;
        }
        if let Some(secs) = file.model_timeout_secs {
            self.model_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.tool_timeout_secs {
            self.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(db_path) = file.db_path {
            self.db_path = Some(base_dir.join(db_path));
        }
        if let Some(server) = file.tool_server {
            self.tool_server = server;
        }
        Ok(())
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.ollama_url = url;
        }
        if let Some(model) = lookup("SQLPILOT_MODEL") {
            self.model = model;
        }
        if let Some(path) = lookup("SQLPILOT_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(command) = lookup("SQLPILOT_MCP_COMMAND") {
            let mut parts = command.split_whitespace().map(str::to_string);
            let program = parts.next().ok_or_else(|| {
                SqlPilotError::Configuration("SQLPILOT_MCP_COMMAND is empty".into())
            })?;
            self.tool_server.command = program;
            self.tool_server.args = parts.collect();
        }
        if let Some(raw) = lookup("SQLPILOT_MAX_ROUND_TRIPS") {
            self.max_round_trips = parse_env("SQLPILOT_MAX_ROUND_TRIPS", &raw)?;
        }
        if let Some(raw) = lookup("SQLPILOT_MODEL_TIMEOUT_SECS") {
            self.model_timeout =
                Duration::from_secs(parse_env("SQLPILOT_MODEL_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("SQLPILOT_TOOL_TIMEOUT_SECS") {
            self.tool_timeout =
                Duration::from_secs(parse_env("SQLPILOT_TOOL_TIMEOUT_SECS", &raw)?);
        }
        Ok(())
    }

    /// Tool server launch parameters with the database path appended.
    pub fn resolved_tool_server(&self) -> StdioServerConfig {
        let mut server = self.tool_server.clone();
        if let Some(db_path) = &self.db_path {
            server.args.push("--db-path".into());
            server.args.push(db_path.display().to_string());
        }
        server
    }

    /// Reject values the loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_round_trips == 0 {
            return Err(SqlPilotError::Configuration(
                "max_round_trips must be at least 1".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(SqlPilotError::Configuration("model must not be empty".into()));
        }
        if self.tool_server.command.trim().is_empty() {
            return Err(SqlPilotError::Configuration(
                "tool_server.command must not be empty".into(),
            ));
        }
        if self.model_timeout.is_zero() || self.tool_timeout.is_zero() {
            return Err(SqlPilotError::Configuration(
                "timeouts must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SqlPilotError::Configuration(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = SqlPilotConfig::default();
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.max_round_trips, DEFAULT_MAX_ROUND_TRIPS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SqlPilotConfig::default();
        config
            .apply_env_from(lookup(&[
                ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
                ("SQLPILOT_MODEL", "qwen2.5"),
                ("SQLPILOT_MAX_ROUND_TRIPS", "4"),
                ("SQLPILOT_TOOL_TIMEOUT_SECS", "5"),
                ("SQLPILOT_MCP_COMMAND", "uv run mcp-server-sqlite"),
            ]))
            .unwrap();

        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.model, "qwen2.5");
        assert_eq!(config.max_round_trips, 4);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert_eq!(config.tool_server.command, "uv");
        assert_eq!(config.tool_server.args, vec!["run", "mcp-server-sqlite"]);
    }

    #[test]
    fn invalid_env_number_is_a_configuration_error() {
        let mut config = SqlPilotConfig::default();
        let err = config
            .apply_env_from(lookup(&[("SQLPILOT_MAX_ROUND_TRIPS", "many")]))
            .unwrap_err();
        assert!(matches!(err, SqlPilotError::Configuration(msg) if msg.contains("SQLPILOT_MAX_ROUND_TRIPS")));
    }

    #[test]
    fn db_path_is_appended_to_server_args() {
        let config = SqlPilotConfig {
            db_path: Some(PathBuf::from("/data/jeopardy.db")),
            ..Default::default()
        };
        let server = config.resolved_tool_server();
        assert_eq!(
            server.display_command(),
            "uvx mcp-server-sqlite --db-path /data/jeopardy.db"
        );
    }

    #[test]
    fn zero_round_trips_is_rejected() {
        let config = SqlPilotConfig {
            max_round_trips: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SqlPilotError::Configuration(_))
        ));
    }
}
