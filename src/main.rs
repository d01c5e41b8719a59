//! sqlpilot CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use sqlpilot::agent::{Conversation, Session};
use sqlpilot::agent_loop::{LoopEvent, LoopEventSink, Orchestrator};
use sqlpilot::cli::repl::{run_repl, ReplOptions};
use sqlpilot::cli::{Cli, Commands};
use sqlpilot::config::SqlPilotConfig;
use sqlpilot::error::SqlPilotError;
use sqlpilot::mcp::MCPToolServer;
use sqlpilot::provider::OllamaEndpoint;
use sqlpilot::tools::{format_tool_output, ToolServer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let mut filter = EnvFilter::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        for directive in [
            format!("sqlpilot={level}"),
            "h2=warn".to_string(),
            "hyper=warn".to_string(),
            "reqwest=warn".to_string(),
        ] {
            match directive.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring log directive '{directive}': {e}"),
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), SqlPilotError> {
    let mut config = SqlPilotConfig::load(cli.global.config.as_deref())?;
    cli.global.apply(&mut config);
    config.validate()?;

    let server_config = config.resolved_tool_server();
    info!(command = %server_config.display_command(), "starting tool server");
    let server = Arc::new(MCPToolServer::connect(&server_config).await?);
    info!(server = server.label(), "tool server connected");

    let result = dispatch(cli.command, &config, server.clone()).await;

    if let Err(e) = server.shutdown().await {
        warn!(server = server.label(), error = %e, "tool server did not shut down cleanly");
    }
    result
}

async fn dispatch(
    command: Commands,
    config: &SqlPilotConfig,
    server: Arc<MCPToolServer>,
) -> Result<(), SqlPilotError> {
    let model = OllamaEndpoint::from_config(config)?;
    if matches!(command, Commands::Ask(_) | Commands::Chat(_)) {
        check_model(&model).await;
    }

    let tools: Arc<dyn ToolServer> = server;
    let orchestrator = Orchestrator::discover(Arc::new(model), tools)
        .await?
        .with_config(config)
        .with_event_sink(progress_sink());

    match command {
        Commands::Ask(args) => {
            let mut session = Session::new(orchestrator);
            let answer = session.ask(&args.question()).await?;
            println!("{}", answer.text);
        }
        Commands::Chat(args) => {
            let mut session = Session::new(orchestrator).with_history(args.keep_history);
            if let Some(path) = &args.resume {
                let conversation = Conversation::load(path)?;
                info!(path = %path.display(), turns = conversation.len(), "resuming conversation");
                session = session.resume(conversation)?;
            }
            let options = ReplOptions {
                transcript: args.transcript,
            };
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_repl(&mut session, stdin, &mut stdout, &options).await?;
        }
        Commands::Tools => {
            for tool in orchestrator.catalog().iter() {
                println!("{:<20} {}", tool.name, tool.description);
            }
        }
        Commands::Call(args) => {
            let arguments = args.arguments()?;
            let session = Session::new(orchestrator);
            let output = session.call(&args.tool, arguments).await?;
            if output.is_error {
                return Err(SqlPilotError::tool_server(args.tool, output.text));
            }
            println!("{}", format_tool_output(&output.text));
        }
    }

    Ok(())
}

/// Warn early when Ollama is down or the model has not been pulled.
async fn check_model(model: &OllamaEndpoint) {
    match model.has_model().await {
        Ok(true) => {}
        Ok(false) => warn!(
            model = model.model(),
            "model not found locally; run `ollama pull {}`",
            model.model()
        ),
        Err(e) => warn!(error = %e, "could not list Ollama models"),
    }
}

fn progress_sink() -> LoopEventSink {
    Arc::new(|event: &LoopEvent| match event {
        LoopEvent::ToolCallStarted { call, round_trip } => {
            eprintln!(
                "[{round_trip}] {} {}",
                call.name,
                serde_json::Value::Object(call.arguments.clone())
            );
        }
        LoopEvent::ToolResult { result, .. } => {
            let output = truncate(&result.content, 200);
            if result.is_error {
                eprintln!("    error: {output}");
            } else {
                eprintln!("    {output}");
            }
        }
        LoopEvent::CorrectiveRetry { detail } => {
            eprintln!("    (retrying: {detail})");
        }
        _ => {}
    })
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.len() <= max {
        return text.replace('\n', " ");
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", text[..end].replace('\n', " "))
}
