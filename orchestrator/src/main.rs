//! Orchestrator CLI entry point.

use clap::Parser;
use eyre::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;

use orchestrator::cli::{Cli, Command, ConfigCommand, SessionCommand};
use orchestrator::config::Config;
use orchestrator::llm::{AnthropicClient, LLMGateway, LlmClient, MockLlmClient};
use orchestrator::pipeline::{ExecutionRequest, Orchestrator};
use orchestrator::prompts::PromptStore;
use orchestrator::self_analysis::{DeepenThresholds, SelfAnalyzer};
use orchestrator::session::SessionStore;
use orchestrator::vision::MockVisionModel;
use orchestrator::{capture::RetainingScreenCapture, capture::ScreenCapture, vision::VisionModel};

fn setup_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
    info!("logging initialized");
    Ok(())
}

/// Builds the primary/fallback `LlmClient` pair from config. Falls back to
/// an always-empty mock when the configured API key env var isn't set, so
/// `orchestrator run` still produces a degraded-but-non-panicking result
/// rather than failing to start.
fn build_gateway(config: &Config) -> LLMGateway {
    let primary: Box<dyn LlmClient> = match AnthropicClient::from_config(&config.llm) {
        Ok(client) => Box::new(client),
        Err(err) => {
            tracing::warn!(%err, "build_gateway: falling back to a no-op LLM client, no usable API key configured");
            Box::new(MockLlmClient::new(&config.llm.model, vec![]))
        }
    };
    let fallback: Option<Box<dyn LlmClient>> = None;
    LLMGateway::new(primary, fallback)
}

fn build_orchestrator(config: &Config) -> Orchestrator {
    let gateway = build_gateway(config);
    let prompts = PromptStore::new();
    let transport = Arc::new(mcpkit::MockTransport::new());
    let registry = mcpkit::McpRegistry::new(transport);
    let vision: Box<dyn VisionModel> = Box::new(MockVisionModel::new(vec![]));
    let capture: Box<dyn ScreenCapture> = Box::new(RetainingScreenCapture::new(config.capture.directory.to_string_lossy().to_string(), config.capture.max_stored));
    let analyzer = SelfAnalyzer::new(
        config.intervention.password.clone(),
        DeepenThresholds { error_rate: config.thresholds.error_rate, complexity: config.thresholds.code_complexity },
    );
    Orchestrator::new(gateway, prompts, registry, vision, capture, analyzer, config.retry.item_execution_max_attempts)
}

fn print_result(result: &orchestrator::pipeline::ExecutionResult, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string()));
        return;
    }
    match &result.body {
        orchestrator::pipeline::OutcomeBody::Chat { reply } => println!("{reply}"),
        orchestrator::pipeline::OutcomeBody::Analysis { findings, todo, intervention_handed_off } => {
            println!("findings ({}):", findings.len());
            for finding in findings {
                println!("  - {finding}");
            }
            println!("todo ({} items, handed off: {intervention_handed_off}):", todo.len());
            for item in todo {
                println!("  [{:?}] {}: {}", item.status, item.id, item.action);
            }
        }
        orchestrator::pipeline::OutcomeBody::Task { plan, result: summary } => {
            println!("plan ({} items, success: {}):", plan.len(), result.success);
            for item in plan {
                println!("  [{:?}] {}: {}", item.status, item.id, item.action);
            }
            if let Some(summary) = summary {
                println!("summary: {}", summary.summary);
            }
        }
    }
}

async fn run_once(orchestrator: &Orchestrator, sessions: &mut SessionStore, session_id: &str, message: String, password: Option<String>, tts: bool) -> orchestrator::pipeline::ExecutionResult {
    let session = sessions.get_or_create(session_id);
    orchestrator.execute(session, ExecutionRequest { user_message: message, password, tts_enabled: tts }).await
}

/// Prints stage progress to stderr as the pipeline runs, so stdout stays
/// clean for `--json` output. Consumes from `EventBus::subscribe`, the one
/// piece of `Orchestrator` state meant for exactly this kind of observer.
fn spawn_progress_printer(orchestrator: &Orchestrator) {
    use orchestrator::events::StageEvent;
    let mut receiver = orchestrator.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                StageEvent::StageStarted { stage_id, .. } => eprintln!("  -> {stage_id}"),
                StageEvent::StageCompleted { stage_id, duration_ms, fallback_used, model_used, .. } => {
                    eprintln!("  <- {stage_id} ({duration_ms}ms, model={model_used}{})", if fallback_used { ", fallback" } else { "" });
                }
                StageEvent::StageFallback { stage_id, reason, .. } => eprintln!("  !! {stage_id} fell back: {reason}"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("failed to set up logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("failed to load configuration")?;
    let orchestrator = build_orchestrator(&config);
    spawn_progress_printer(&orchestrator);
    let mut sessions = SessionStore::new();

    match cli.command {
        Some(Command::Run { message, session, password, tts, json }) => {
            let result = run_once(&orchestrator, &mut sessions, &session, message, password, tts).await;
            print_result(&result, json);
        }
        Some(Command::Config { command: ConfigCommand::Show }) => {
            println!("{}", serde_yaml::to_string(&config).context("failed to render config as YAML")?);
        }
        Some(Command::Session { command: SessionCommand::Inspect { session } }) => match sessions.get(&session) {
            Some(found) => {
                println!("session: {session}");
                println!("  mode: {:?}", found.mode());
                println!("  chat turns: {}", found.recent_turns().count());
                println!("  last plan ({} items):", found.last_plan().len());
                for item in found.last_plan() {
                    println!("    [{:?}] {}: {}", item.status, item.id, item.action);
                }
            }
            None => println!("no such session: {session}"),
        },
        Some(Command::Session { command: SessionCommand::Metrics }) => {
            let metrics = sessions.metrics();
            println!("active sessions: {}", metrics.active_sessions);
            println!("  idle: {}", metrics.idle_sessions);
            println!("  task: {}", metrics.task_sessions);
            println!("  dev:  {}", metrics.dev_sessions);
            let gateway_metrics = orchestrator.gateway.metrics();
            println!("gateway calls: {}", gateway_metrics.calls);
            println!("  retries: {}", gateway_metrics.retries);
            println!("  fallback calls: {}", gateway_metrics.fallback_calls);
            println!("  input tokens: {}", gateway_metrics.input_tokens);
            println!("  output tokens: {}", gateway_metrics.output_tokens);
        }
        Some(Command::Repl { session }) => {
            let stdin = io::stdin();
            print!("> ");
            io::stdout().flush().ok();
            for line in stdin.lock().lines() {
                let line = line.context("failed to read stdin")?;
                if line.trim().is_empty() {
                    print!("> ");
                    io::stdout().flush().ok();
                    continue;
                }
                let result = run_once(&orchestrator, &mut sessions, &session, line, None, false).await;
                print_result(&result, false);
                print!("> ");
                io::stdout().flush().ok();
            }
        }
        None => {
            println!("orchestrator v{}", env!("CARGO_PKG_VERSION"));
            println!("  LLM: {} ({})", config.llm.provider, config.llm.model);
            println!("  Max attempts: {}", config.retry.item_execution_max_attempts);
            println!("Run `orchestrator run \"<message>\"` or `orchestrator repl` to start.");
        }
    }

    Ok(())
}
